use serde::{Deserialize, Serialize};

const TITLE_MAX_CHARS: usize = 50;

/// Conversation container shown in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ChatSession {
    /// Title derived from the first user message of a conversation.
    pub fn title_from(message: &str) -> String {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return "New Chat".to_string();
        }
        let mut title: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        if trimmed.chars().count() > TITLE_MAX_CHARS {
            title.push_str("...");
        }
        title
    }
}

/// Where a mood entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodContext {
    /// Manual check-in before a conversation.
    PreConversation,
    /// Parsed from a `MOOD_LOG:` directive in an assistant answer.
    AiDetected,
}

impl MoodContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodContext::PreConversation => "pre-conversation",
            MoodContext::AiDetected => "ai-detected",
        }
    }
}

/// Mood entry to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMoodEntry {
    pub session_id: Option<String>,
    pub mood: String,
    pub intensity: u8,
    pub note: Option<String>,
    pub context: MoodContext,
}

/// Stored mood entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodEntry {
    pub id: String,
    pub session_id: Option<String>,
    pub mood: String,
    pub intensity: i64,
    pub note: Option<String>,
    pub context: String,
    pub created_at: i64,
}

/// Uploaded file recorded in the media library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: String,
    pub session_id: Option<String>,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub created_at: i64,
    /// Title of the owning session, if it still exists.
    pub session_title: Option<String>,
}
