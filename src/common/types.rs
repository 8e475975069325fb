use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Greeting shown when a new conversation opens.
pub const GREETING: &str = "Hello! I'm here to support you with your mental health journey. Feel free to share what's on your mind, ask questions, or just have a conversation. How are you feeling today?";

/// Shown as a notification when the chat endpoint cannot be reached.
pub const CONNECTION_ERROR_NOTICE: &str =
    "I'm having trouble connecting right now. Please try again in a moment.";

/// Appended to the conversation so a failed turn still gets an answer.
pub const FALLBACK_REPLY: &str = "I'm experiencing some technical difficulties right now. Please try again in a moment, and remember that if you're in crisis, please reach out to a mental health professional or crisis hotline.";

/// One chat message, from the user or the assistant.
///
/// Serialized in camelCase because the chat endpoint reads `content` and
/// `isUser` from the conversation history it receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub is_user: bool,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, true)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, false)
    }

    pub fn greeting() -> Self {
        Self::assistant(GREETING)
    }

    fn new(content: impl Into<String>, is_user: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            is_user,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_entries_use_camel_case_fields() {
        let message = ChatMessage::user("hi");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["isUser"], true);
        assert_eq!(json["content"], "hi");
        assert!(json.get("is_user").is_none());
    }
}
