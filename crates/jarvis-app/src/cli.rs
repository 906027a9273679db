//! CLI argument definitions for the Jarvis application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use jarvis_core::types::RelayVariant;

/// Environment variable overriding the config file path.
pub const CONFIG_ENV: &str = "JARVIS_CONFIG";
/// Environment variable overriding the relay port.
pub const PORT_ENV: &str = "JARVIS_PORT";
/// Environment variable overriding the relay base URL used by `chat`.
pub const RELAY_URL_ENV: &str = "JARVIS_RELAY_URL";

/// Jarvis, a voice assistant relay and terminal client.
#[derive(Parser, Debug)]
#[command(name = "jarvis", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay server.
    Serve {
        /// Port to listen on.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// Reply payload: `audio` or `text`.
        #[arg(long = "variant", value_parser = parse_variant)]
        variant: Option<RelayVariant>,
    },
    /// Talk to a running relay from the terminal.
    Chat {
        /// Relay base URL, e.g. http://localhost:3001.
        #[arg(short = 'u', long = "relay-url")]
        relay_url: Option<String>,

        /// Directory where audio replies are saved.
        #[arg(short = 'o', long = "audio-dir", default_value = "jarvis-replies")]
        audio_dir: PathBuf,

        /// Send one message and exit instead of reading stdin.
        #[arg(short = 'm', long = "message")]
        message: Option<String>,
    },
}

fn parse_variant(value: &str) -> Result<RelayVariant, String> {
    match value.to_ascii_lowercase().as_str() {
        "audio" => Ok(RelayVariant::Audio),
        "text" => Ok(RelayVariant::Text),
        other => Err(format!("unknown variant '{}', expected 'audio' or 'text'", other)),
    }
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > JARVIS_CONFIG env var > ~/.jarvis/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Resolve the relay port.
///
/// Priority: --port flag > JARVIS_PORT env var > config file value > 3001.
pub fn resolve_port(flag: Option<u16>, config_port: u16) -> u16 {
    pick_port(flag, std::env::var(PORT_ENV).ok(), config_port)
}

fn pick_port(flag: Option<u16>, env: Option<String>, config_port: u16) -> u16 {
    if let Some(p) = flag {
        return p;
    }
    if let Some(p) = env.and_then(|v| v.trim().parse::<u16>().ok()) {
        return p;
    }
    if config_port != 0 {
        return config_port;
    }
    3001
}

/// Resolve the relay base URL for `chat`.
///
/// Priority: --relay-url flag > JARVIS_RELAY_URL env var > config file value.
pub fn resolve_relay_url(flag: Option<String>, config_url: &str) -> String {
    pick_relay_url(flag, std::env::var(RELAY_URL_ENV).ok(), config_url)
}

fn pick_relay_url(flag: Option<String>, env: Option<String>, config_url: &str) -> String {
    flag.or(env)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| config_url.to_string())
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".jarvis").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".jarvis").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_priority() {
        assert_eq!(pick_port(Some(4000), Some("5000".into()), 3001), 4000);
        assert_eq!(pick_port(None, Some("5000".into()), 3001), 5000);
        assert_eq!(pick_port(None, Some("not-a-port".into()), 3002), 3002);
        assert_eq!(pick_port(None, None, 0), 3001);
    }

    #[test]
    fn test_relay_url_priority() {
        assert_eq!(
            pick_relay_url(Some("http://a".into()), Some("http://b".into()), "http://c"),
            "http://a"
        );
        assert_eq!(pick_relay_url(None, Some("http://b".into()), "http://c"), "http://b");
        assert_eq!(pick_relay_url(None, Some("  ".into()), "http://c"), "http://c");
        assert_eq!(pick_relay_url(None, None, "http://c"), "http://c");
    }

    #[test]
    fn test_parse_serve_subcommand() {
        let args = CliArgs::parse_from(["jarvis", "serve", "--port", "4100", "--variant", "text"]);
        match args.command {
            Command::Serve { port, variant } => {
                assert_eq!(port, Some(4100));
                assert_eq!(variant, Some(RelayVariant::Text));
            }
            other => panic!("Expected Serve, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_chat_with_global_flags() {
        let args = CliArgs::parse_from([
            "jarvis",
            "chat",
            "-m",
            "hello",
            "--config",
            "/tmp/jarvis.toml",
            "-l",
            "debug",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/jarvis.toml")));
        assert_eq!(args.resolve_log_level("info"), "debug");
        match args.command {
            Command::Chat {
                message, audio_dir, ..
            } => {
                assert_eq!(message.as_deref(), Some("hello"));
                assert_eq!(audio_dir, PathBuf::from("jarvis-replies"));
            }
            other => panic!("Expected Chat, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_variant_is_rejected() {
        let result = CliArgs::try_parse_from(["jarvis", "serve", "--variant", "video"]);
        assert!(result.is_err());
    }
}
