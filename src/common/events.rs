use crate::mood::MoodTrends;
use crate::storage::models::{ChatSession, MediaItem};
use crate::streaming::{MoodDirective, StreamEnd};

use super::types::ChatMessage;

/// Events sent from the backend to the UI.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    SessionsLoaded(Vec<ChatSession>),
    /// A session became current. `None` means a fresh, unsaved conversation.
    SessionSelected {
        session_id: Option<String>,
        history: Vec<ChatMessage>,
    },
    /// First message of a new conversation created a stored session.
    SessionCreated(ChatSession),
    UserMessage(ChatMessage),
    AssistantDelta(String),
    /// Sent exactly once per assistant turn, whatever the outcome.
    TurnFinished(TurnSummary),
    MoodLogged(MoodDirective),
    ConnectionError(String),
    Notice(String),
    TrendsLoaded(MoodTrends),
    LibraryLoaded(Vec<MediaItem>),
}

#[derive(Debug, Clone)]
pub struct TurnSummary {
    /// Finalized assistant message, partial when the stream was interrupted.
    pub message: Option<ChatMessage>,
    /// Canned reply appended after a transport failure.
    pub fallback: Option<ChatMessage>,
    pub end: StreamEnd,
}
