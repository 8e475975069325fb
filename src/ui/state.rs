use crate::common::{ChatCommand, ChatEvent, ChatMessage};
use crate::mood::{MoodCheckIn, MoodTrends};
use crate::storage::models::{ChatSession, MediaItem};
use crate::streaming::StreamEnd;

/// Local view state of the window.
pub struct AppState {
    pub messages: Vec<ChatMessage>,
    pub input_text: String,
    pub sessions: Vec<ChatSession>,
    pub current_session: Option<String>,
    pub search_text: String,
    /// True from the user's message until the turn finishes.
    pub streaming: bool,
    /// Assistant text received so far in the current turn.
    pub draft: String,
    /// Connection error shown above the conversation.
    pub banner: Option<String>,
    pub notice: Option<String>,
    pub check_in: MoodCheckIn,
    pub trends: MoodTrends,
    pub library: Vec<MediaItem>,
    pub show_library: bool,
    pub upload_path: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::greeting()],
            input_text: String::new(),
            sessions: Vec::new(),
            current_session: None,
            search_text: String::new(),
            streaming: false,
            draft: String::new(),
            banner: None,
            notice: None,
            check_in: MoodCheckIn::default(),
            trends: MoodTrends::default(),
            library: Vec::new(),
            show_library: false,
            upload_path: String::new(),
        }
    }

    /// Fold a backend event into the view state.
    ///
    /// Returns a follow-up command when the event makes other data stale.
    pub fn apply(&mut self, event: ChatEvent) -> Option<ChatCommand> {
        match event {
            ChatEvent::SessionsLoaded(sessions) => self.sessions = sessions,
            ChatEvent::SessionSelected {
                session_id,
                history,
            } => {
                self.current_session = session_id;
                self.messages = if history.is_empty() {
                    vec![ChatMessage::greeting()]
                } else {
                    history
                };
                self.streaming = false;
                self.draft.clear();
                self.banner = None;
                self.show_library = false;
            }
            ChatEvent::SessionCreated(session) => {
                self.current_session = Some(session.id.clone());
                if !self.sessions.iter().any(|known| known.id == session.id) {
                    self.sessions.insert(0, session);
                }
            }
            ChatEvent::UserMessage(message) => {
                self.messages.push(message);
                self.streaming = true;
                self.draft.clear();
                self.banner = None;
            }
            ChatEvent::AssistantDelta(text) => self.draft.push_str(&text),
            ChatEvent::TurnFinished(summary) => {
                self.streaming = false;
                self.draft.clear();
                self.messages.extend(summary.message);
                self.messages.extend(summary.fallback);
                if summary.end == StreamEnd::Cancelled {
                    self.notice = Some("Reply stopped".to_string());
                }
            }
            ChatEvent::MoodLogged(directive) => {
                self.notice = Some(format!("Mood noted: {}", directive.mood));
                return Some(ChatCommand::RefreshTrends);
            }
            ChatEvent::ConnectionError(text) => self.banner = Some(text),
            ChatEvent::Notice(text) => {
                if text == "Mood logged" {
                    self.check_in = MoodCheckIn::default();
                }
                self.notice = Some(text);
            }
            ChatEvent::TrendsLoaded(trends) => self.trends = trends,
            ChatEvent::LibraryLoaded(items) => self.library = items,
        }
        None
    }

    /// Typing indicator: a reply is pending but no text has arrived yet.
    pub fn is_typing(&self) -> bool {
        self.streaming && self.draft.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TurnSummary;
    use crate::common::types::{FALLBACK_REPLY, GREETING};
    use crate::streaming::MoodDirective;

    #[test]
    fn starts_with_greeting() {
        let state = AppState::new();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].content, GREETING);
        assert!(!state.streaming);
    }

    #[test]
    fn streaming_turn_builds_draft_then_commits_message() {
        let mut state = AppState::new();
        state.apply(ChatEvent::UserMessage(ChatMessage::user("hi")));
        assert!(state.is_typing());

        state.apply(ChatEvent::AssistantDelta("Hi ".into()));
        state.apply(ChatEvent::AssistantDelta("there".into()));
        assert!(!state.is_typing());
        assert_eq!(state.draft, "Hi there");

        state.apply(ChatEvent::TurnFinished(TurnSummary {
            message: Some(ChatMessage::assistant("Hi there")),
            fallback: None,
            end: StreamEnd::Completed,
        }));
        assert!(!state.streaming);
        assert!(state.draft.is_empty());
        let contents: Vec<&str> = state.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec![GREETING, "hi", "Hi there"]);
    }

    #[test]
    fn failed_turn_shows_banner_and_fallback() {
        let mut state = AppState::new();
        state.apply(ChatEvent::UserMessage(ChatMessage::user("hi")));
        state.apply(ChatEvent::ConnectionError("offline".into()));
        state.apply(ChatEvent::TurnFinished(TurnSummary {
            message: None,
            fallback: Some(ChatMessage::assistant(FALLBACK_REPLY)),
            end: StreamEnd::TransportFailed("refused".into()),
        }));

        assert_eq!(state.banner.as_deref(), Some("offline"));
        assert_eq!(state.messages.last().unwrap().content, FALLBACK_REPLY);

        state.apply(ChatEvent::UserMessage(ChatMessage::user("again")));
        assert!(state.banner.is_none());
    }

    #[test]
    fn selecting_an_empty_session_shows_greeting() {
        let mut state = AppState::new();
        state.apply(ChatEvent::UserMessage(ChatMessage::user("hi")));
        state.apply(ChatEvent::SessionSelected {
            session_id: None,
            history: Vec::new(),
        });

        assert!(!state.streaming);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].content, GREETING);
    }

    #[test]
    fn detected_mood_requests_fresh_trends() {
        let mut state = AppState::new();
        let follow_up = state.apply(ChatEvent::MoodLogged(MoodDirective {
            mood: "sad".into(),
            intensity: 2,
            note: None,
        }));

        assert!(matches!(follow_up, Some(ChatCommand::RefreshTrends)));
        assert_eq!(state.notice.as_deref(), Some("Mood noted: sad"));
    }

    #[test]
    fn created_session_is_listed_once() {
        let mut state = AppState::new();
        let session = ChatSession {
            id: "s1".into(),
            title: "hi".into(),
            created_at: 1,
            updated_at: 1,
        };
        state.apply(ChatEvent::SessionCreated(session.clone()));
        state.apply(ChatEvent::SessionCreated(session));

        assert_eq!(state.sessions.len(), 1);
        assert_eq!(state.current_session.as_deref(), Some("s1"));
    }

    #[test]
    fn stopped_reply_keeps_partial_text() {
        let mut state = AppState::new();
        state.apply(ChatEvent::UserMessage(ChatMessage::user("hi")));
        state.apply(ChatEvent::AssistantDelta("Part".into()));
        state.apply(ChatEvent::TurnFinished(TurnSummary {
            message: Some(ChatMessage::assistant("Part")),
            fallback: None,
            end: StreamEnd::Cancelled,
        }));

        assert!(!state.streaming);
        assert_eq!(state.messages.last().unwrap().content, "Part");
        assert_eq!(state.notice.as_deref(), Some("Reply stopped"));
    }
}
