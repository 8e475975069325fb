use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompanionError>;

/// Errors surfaced by the companion backend.
#[derive(Debug, Error)]
pub enum CompanionError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Chat endpoint answered with a non-success status.
    #[error("chat endpoint returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// No response headers within the configured request timeout.
    #[error("chat endpoint did not respond within {0:?}")]
    Timeout(std::time::Duration),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CompanionError {
    /// Transport-class failures are the ones the user sees as a connection error.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CompanionError::Transport(_)
                | CompanionError::HttpStatus { .. }
                | CompanionError::Timeout(_)
        )
    }
}
