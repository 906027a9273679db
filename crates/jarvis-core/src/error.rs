use thiserror::Error;

/// Top-level error type for the Jarvis system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for JarvisError` so that the `?` operator works
/// across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JarvisError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Microphone access was denied by the user or the host.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// The host lacks a required capability (speech recognition, media devices).
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Speech capture requires a secure context (HTTPS or localhost).
    #[error("Insecure context: {0}")]
    InsecureContext(String),

    /// The relay or the TTS provider was unreachable or answered non-2xx.
    #[error("Network error: {0}")]
    Network(String),

    /// Input was empty or whitespace-only. Callers drop it silently.
    #[error("Empty input")]
    EmptyInput,

    /// The TTS provider reported a failure.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Widget error: {0}")]
    Widget(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl JarvisError {
    /// Whether this error should be shown to the user as a notice.
    ///
    /// `EmptyInput` is the only silent kind.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, JarvisError::EmptyInput)
    }
}

impl From<toml::de::Error> for JarvisError {
    fn from(err: toml::de::Error) -> Self {
        JarvisError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for JarvisError {
    fn from(err: toml::ser::Error) -> Self {
        JarvisError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for JarvisError {
    fn from(err: serde_json::Error) -> Self {
        JarvisError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Jarvis operations.
pub type Result<T> = std::result::Result<T, JarvisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = JarvisError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_taxonomy_display() {
        let cases: Vec<(JarvisError, &str)> = vec![
            (
                JarvisError::Permission("microphone".into()),
                "Permission denied: microphone",
            ),
            (
                JarvisError::Unsupported("speech recognition".into()),
                "Unsupported: speech recognition",
            ),
            (
                JarvisError::InsecureContext("http origin".into()),
                "Insecure context: http origin",
            ),
            (
                JarvisError::Network("connection refused".into()),
                "Network error: connection refused",
            ),
            (JarvisError::EmptyInput, "Empty input"),
            (
                JarvisError::Upstream("status 401".into()),
                "Upstream error: status 401",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_empty_input_is_silent() {
        assert!(!JarvisError::EmptyInput.is_user_visible());
        assert!(JarvisError::Network("down".into()).is_user_visible());
        assert!(JarvisError::Permission("denied".into()).is_user_visible());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: JarvisError = io_err.into();
        assert!(matches!(err, JarvisError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: JarvisError = err.unwrap_err().into();
        assert!(matches!(err, JarvisError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: JarvisError = err.unwrap_err().into();
        assert!(matches!(err, JarvisError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }
}
