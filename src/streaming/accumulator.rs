use thiserror::Error;

use crate::common::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Empty,
    Accumulating,
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccumulatorError {
    #[error("assistant turn is already finalized")]
    Finalized,
}

/// Receives the finalized assistant message of a turn.
pub trait MessageSink {
    fn persist(&self, message: &ChatMessage);
}

impl<T: MessageSink + ?Sized> MessageSink for &T {
    fn persist(&self, message: &ChatMessage) {
        (**self).persist(message);
    }
}

/// Folds clean deltas into the single in-flight assistant message.
pub struct ConversationAccumulator {
    state: TurnState,
    message: Option<ChatMessage>,
}

impl Default for ConversationAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationAccumulator {
    pub fn new() -> Self {
        Self {
            state: TurnState::Empty,
            message: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> TurnState {
        self.state
    }

    #[cfg(test)]
    pub fn message(&self) -> Option<&ChatMessage> {
        self.message.as_ref()
    }

    /// Start a new turn. The previous message, if any, is dropped.
    #[cfg(test)]
    pub fn begin_turn(&mut self) {
        self.state = TurnState::Empty;
        self.message = None;
    }

    pub fn append(&mut self, delta: &str) -> Result<Option<&ChatMessage>, AccumulatorError> {
        match self.state {
            TurnState::Finalized => return Err(AccumulatorError::Finalized),
            _ if delta.is_empty() => {}
            TurnState::Empty => {
                self.message = Some(ChatMessage::assistant(delta));
                self.state = TurnState::Accumulating;
            }
            TurnState::Accumulating => {
                if let Some(message) = self.message.as_mut() {
                    message.content.push_str(delta);
                }
            }
        }
        Ok(self.message.as_ref())
    }

    /// Close the turn and hand the message to `sink`.
    ///
    /// Runs the sink at most once per turn; later calls only return the message.
    pub fn finalize(&mut self, sink: &impl MessageSink) -> Option<&ChatMessage> {
        if self.state != TurnState::Finalized {
            self.state = TurnState::Finalized;
            if let Some(message) = &self.message {
                sink.persist(message);
            }
        }
        self.message.as_ref()
    }
}
