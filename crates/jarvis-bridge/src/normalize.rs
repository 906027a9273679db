//! Normalization of voice-widget event payloads.
//!
//! The widget reports conversation turns in several shapes:
//!
//! - custom events on `window` named `user-message`, `ai-message`,
//!   `convai-user-message` or `convai-ai-message`, text in `detail`
//! - callback props on the element (`onUserMessage` / `onAIMessage`), where
//!   the speaker is inferred from the event type
//! - `postMessage` envelopes `{type, detail}` with the same four type names
//!
//! All of them collapse into one [`NormalizedMessage`]. Anything else is
//! dropped.

use serde::Deserialize;
use serde_json::Value;

use jarvis_core::types::Speaker;

/// Window event names the bridge listens for.
pub const WINDOW_EVENTS: &[&str] = &[
    "user-message",
    "ai-message",
    "convai-user-message",
    "convai-ai-message",
];

/// A widget event as captured from the page, before interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawWidgetEvent {
    /// A `CustomEvent` dispatched on `window`.
    WindowEvent { name: String, detail: Value },
    /// A callback prop invoked by the custom element.
    ElementCallback { event_type: String, detail: Value },
    /// The `data` of a `message` event.
    PostMessage { data: Value },
}

/// One conversation turn reported by the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub text: String,
    pub speaker: Speaker,
}

/// `postMessage` payload; `type` uses the window event names.
#[derive(Debug, Deserialize)]
struct PostMessageEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    detail: Value,
}

/// Speaker for a window event name, or `None` for names the bridge ignores.
pub fn speaker_for_event(name: &str) -> Option<Speaker> {
    match name {
        "user-message" | "convai-user-message" => Some(Speaker::User),
        "ai-message" | "convai-ai-message" => Some(Speaker::Assistant),
        _ => None,
    }
}

/// Speaker for an element callback type such as `aimessage`, `onAIMessage`
/// or one of the window event names. Only a leading `ai`/`agent` word marks
/// the assistant, so `convai-user-message` stays a user turn.
fn speaker_for_callback(event_type: &str) -> Speaker {
    if let Some(speaker) = speaker_for_event(event_type) {
        return speaker;
    }
    let name = event_type.to_ascii_lowercase();
    let name = name.strip_prefix("on").unwrap_or(&name);
    let name = name.strip_prefix("convai-").unwrap_or(name);
    if name.starts_with("ai") || name.starts_with("agent") {
        Speaker::Assistant
    } else {
        Speaker::User
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// `detail.text`, else `detail.message`, else `detail` itself when
/// `allow_bare` and it is a string. Empty strings fall through.
fn detail_text(detail: &Value, allow_bare: bool) -> Option<String> {
    non_empty_str(detail.get("text"))
        .or_else(|| non_empty_str(detail.get("message")))
        .or_else(|| {
            if allow_bare {
                non_empty_str(Some(detail))
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
}

/// Interpret a raw widget event.
pub fn normalize(event: &RawWidgetEvent) -> Option<NormalizedMessage> {
    let (text, speaker) = match event {
        RawWidgetEvent::WindowEvent { name, detail } => {
            (detail_text(detail, true)?, speaker_for_event(name)?)
        }
        RawWidgetEvent::ElementCallback { event_type, detail } => {
            (detail_text(detail, false)?, speaker_for_callback(event_type))
        }
        RawWidgetEvent::PostMessage { data } => {
            let envelope = PostMessageEnvelope::deserialize(data).ok()?;
            let speaker = speaker_for_event(&envelope.kind)?;
            (detail_text(&envelope.detail, true)?, speaker)
        }
    };

    Some(NormalizedMessage { text, speaker })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn window(name: &str, detail: Value) -> RawWidgetEvent {
        RawWidgetEvent::WindowEvent {
            name: name.to_string(),
            detail,
        }
    }

    #[test]
    fn test_text_takes_precedence_over_message() {
        let msg = normalize(&window("user-message", json!({"text": "a", "message": "b"}))).unwrap();
        assert_eq!(msg.text, "a");
        assert_eq!(msg.speaker, Speaker::User);
    }

    #[test]
    fn test_message_used_when_text_missing_or_empty() {
        let msg = normalize(&window("ai-message", json!({"message": "b"}))).unwrap();
        assert_eq!(msg.text, "b");
        assert_eq!(msg.speaker, Speaker::Assistant);

        let msg = normalize(&window("ai-message", json!({"text": "", "message": "b"}))).unwrap();
        assert_eq!(msg.text, "b");
    }

    #[test]
    fn test_bare_string_detail() {
        let msg = normalize(&window("convai-user-message", json!("hello there"))).unwrap();
        assert_eq!(msg.text, "hello there");
        assert_eq!(msg.speaker, Speaker::User);
    }

    #[test]
    fn test_all_window_event_names_map() {
        for name in WINDOW_EVENTS {
            assert!(normalize(&window(name, json!({"text": "x"}))).is_some(), "{}", name);
        }
        assert!(normalize(&window("agent-status", json!({"text": "x"}))).is_none());
    }

    #[test]
    fn test_empty_payloads_are_dropped() {
        assert!(normalize(&window("user-message", json!({}))).is_none());
        assert!(normalize(&window("user-message", json!(""))).is_none());
        assert!(normalize(&window("user-message", Value::Null)).is_none());
        assert!(normalize(&window("user-message", json!({"text": 42}))).is_none());
    }

    #[test]
    fn test_element_callback_speaker_from_event_type() {
        let ai = RawWidgetEvent::ElementCallback {
            event_type: "aimessage".to_string(),
            detail: json!({"message": "Right away."}),
        };
        let msg = normalize(&ai).unwrap();
        assert_eq!(msg.speaker, Speaker::Assistant);
        assert_eq!(msg.text, "Right away.");

        let user = RawWidgetEvent::ElementCallback {
            event_type: "usermessage".to_string(),
            detail: json!({"text": "lights"}),
        };
        assert_eq!(normalize(&user).unwrap().speaker, Speaker::User);
    }

    #[test]
    fn test_element_callback_with_window_event_names() {
        let user = RawWidgetEvent::ElementCallback {
            event_type: "convai-user-message".to_string(),
            detail: json!({"text": "turn on the lights"}),
        };
        let msg = normalize(&user).unwrap();
        assert_eq!(msg.speaker, Speaker::User);
        assert_eq!(msg.text, "turn on the lights");

        let ai = RawWidgetEvent::ElementCallback {
            event_type: "convai-ai-message".to_string(),
            detail: json!({"text": "Lights on."}),
        };
        assert_eq!(normalize(&ai).unwrap().speaker, Speaker::Assistant);
    }

    #[test]
    fn test_callback_speaker_matches_leading_word_only() {
        assert_eq!(speaker_for_callback("onAIMessage"), Speaker::Assistant);
        assert_eq!(speaker_for_callback("agentmessage"), Speaker::Assistant);
        assert_eq!(speaker_for_callback("onUserMessage"), Speaker::User);
        assert_eq!(speaker_for_callback("convai-usermessage"), Speaker::User);
        assert_eq!(speaker_for_callback("emailmessage"), Speaker::User);
    }

    #[test]
    fn test_element_callback_ignores_bare_string() {
        let event = RawWidgetEvent::ElementCallback {
            event_type: "usermessage".to_string(),
            detail: json!("bare"),
        };
        assert!(normalize(&event).is_none());
    }

    #[test]
    fn test_post_message_discriminator() {
        let data = json!({"type": "convai-ai-message", "detail": {"text": "Done."}});
        let msg = normalize(&RawWidgetEvent::PostMessage { data }).unwrap();
        assert_eq!(msg.speaker, Speaker::Assistant);
        assert_eq!(msg.text, "Done.");

        let data = json!({"type": "user-message", "detail": "open the pod bay doors"});
        let msg = normalize(&RawWidgetEvent::PostMessage { data }).unwrap();
        assert_eq!(msg.speaker, Speaker::User);
    }

    #[test]
    fn test_unrecognized_post_messages_are_dropped() {
        for data in [
            json!({"type": "webpackOk"}),
            json!({"detail": {"text": "no type"}}),
            json!("just a string"),
            json!({"type": "ai-message"}),
        ] {
            assert!(normalize(&RawWidgetEvent::PostMessage { data }).is_none());
        }
    }
}
