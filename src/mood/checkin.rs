use crate::error::{CompanionError, Result};
use crate::storage::models::{MoodContext, NewMoodEntry};

pub const CHECK_IN_MOODS: [&str; 5] = ["happy", "neutral", "sad", "anxious", "stressed"];
pub const MAX_NOTE_CHARS: usize = 500;
pub const MAX_CHECK_IN_INTENSITY: u8 = 10;

/// Manual mood check-in filled in before a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodCheckIn {
    pub mood: String,
    pub intensity: u8,
    pub note: String,
}

impl Default for MoodCheckIn {
    fn default() -> Self {
        Self {
            mood: String::new(),
            intensity: 5,
            note: String::new(),
        }
    }
}

impl MoodCheckIn {
    pub fn into_entry(self, session_id: Option<String>) -> Result<NewMoodEntry> {
        if self.mood.is_empty() {
            return Err(CompanionError::Validation("Please select a mood".to_string()));
        }
        if !CHECK_IN_MOODS.contains(&self.mood.as_str()) {
            return Err(CompanionError::Validation(format!(
                "Unknown mood `{}`",
                self.mood
            )));
        }
        if !(1..=MAX_CHECK_IN_INTENSITY).contains(&self.intensity) {
            return Err(CompanionError::Validation(format!(
                "Intensity must be between 1 and {MAX_CHECK_IN_INTENSITY}"
            )));
        }

        let note = self.note.trim();
        if note.chars().count() > MAX_NOTE_CHARS {
            return Err(CompanionError::Validation(format!(
                "Note must be less than {MAX_NOTE_CHARS} characters"
            )));
        }

        Ok(NewMoodEntry {
            session_id,
            mood: self.mood,
            intensity: self.intensity,
            note: (!note.is_empty()).then(|| note.to_string()),
            context: MoodContext::PreConversation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_in(mood: &str, intensity: u8, note: &str) -> MoodCheckIn {
        MoodCheckIn {
            mood: mood.to_string(),
            intensity,
            note: note.to_string(),
        }
    }

    #[test]
    fn valid_check_in_becomes_a_pre_conversation_entry() {
        let entry = check_in("anxious", 7, "  big presentation  ")
            .into_entry(Some("s1".to_string()))
            .unwrap();

        assert_eq!(entry.context, MoodContext::PreConversation);
        assert_eq!(entry.note.as_deref(), Some("big presentation"));
        assert_eq!(entry.session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn blank_note_is_stored_as_none() {
        let entry = check_in("happy", 5, "   ").into_entry(None).unwrap();
        assert_eq!(entry.note, None);
    }

    #[test]
    fn rejects_invalid_check_ins() {
        assert!(MoodCheckIn::default().into_entry(None).is_err());
        assert!(check_in("ecstatic", 5, "").into_entry(None).is_err());
        assert!(check_in("sad", 0, "").into_entry(None).is_err());
        assert!(check_in("sad", 11, "").into_entry(None).is_err());
        assert!(check_in("sad", 3, &"x".repeat(501)).into_entry(None).is_err());
        assert!(check_in("sad", 3, &"x".repeat(500)).into_entry(None).is_ok());
    }
}
