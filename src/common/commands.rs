use std::path::PathBuf;

use crate::mood::MoodCheckIn;

/// Commands sent from the UI to the backend.
#[derive(Debug, Clone)]
pub enum ChatCommand {
    SendMessage(String),
    /// Stop reading the in-flight assistant response and keep what arrived.
    CancelTurn,
    NewSession,
    SelectSession(String),
    DeleteSession(String),
    /// Filter the session list by title or message content. Empty lists all.
    SearchSessions(String),
    LogMood(MoodCheckIn),
    UploadMedia(PathBuf),
    RefreshTrends,
    RefreshLibrary,
}
