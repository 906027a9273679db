//! Text replies for the `text` relay variant.

/// Produces the assistant's text reply for a message.
pub trait ReplyGenerator: Send + Sync {
    fn reply(&self, message: &str) -> String;
}

const FALLBACK_REPLIES: &[&str] = &[
    "I understand. How else can I assist you?",
    "Certainly. Is there anything else you need?",
    "Consider it noted. What would you like to do next?",
    "Very good. I am standing by for your next request.",
];

/// Deterministic canned replies.
///
/// A few keywords get a dedicated answer; anything else picks from a fixed
/// list by the message's character count, so the same input always gets
/// the same reply.
#[derive(Debug, Clone, Default)]
pub struct CannedReplies;

impl CannedReplies {
    pub fn new() -> Self {
        Self
    }
}

impl ReplyGenerator for CannedReplies {
    fn reply(&self, message: &str) -> String {
        let lower = message.trim().to_lowercase();

        let keyword = if lower.starts_with("hello") || lower.starts_with("hi ") || lower == "hi" {
            Some("Hello! How can I help you today?")
        } else if lower.contains("thank") {
            Some("You're welcome. Always a pleasure.")
        } else if lower.contains("who are you") || lower.contains("your name") {
            Some("I am Jarvis, your personal assistant.")
        } else if lower.contains("help") {
            Some("I can answer questions or pass your requests along. What do you need?")
        } else {
            None
        };

        keyword
            .map(str::to_string)
            .unwrap_or_else(|| {
                let index = lower.chars().count() % FALLBACK_REPLIES.len();
                FALLBACK_REPLIES[index].to_string()
            })
    }
}
