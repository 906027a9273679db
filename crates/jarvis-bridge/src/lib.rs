//! Jarvis Bridge crate - Adapter between the third-party voice widget and the transcript.
//!
//! - [`normalize`]: turns the widget's assorted event shapes into one
//!   `{text, speaker}` message
//! - [`lifecycle`]: mounts the widget (script, style override, element,
//!   observer, listeners) and guarantees teardown
//!
//! The document itself is reached through [`DocumentHost`].

pub mod error;
pub mod lifecycle;
pub mod normalize;

pub use error::BridgeError;
pub use lifecycle::{DocumentHost, ListenerId, MessageSink, NodeId, ObserverId, WidgetMount};
pub use normalize::{normalize, speaker_for_event, NormalizedMessage, RawWidgetEvent, WINDOW_EVENTS};
