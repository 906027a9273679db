//! Shared domain types, configuration, and errors for the Jarvis assistant.
//!
//! Every other crate in the workspace depends on this one. It holds no
//! behaviour beyond validation and (de)serialization.

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::{JarvisConfig, TtsCredentials};
pub use error::{JarvisError, Result};
pub use events::{Notice, NoticeLevel, NoticeSender};
pub use types::*;
