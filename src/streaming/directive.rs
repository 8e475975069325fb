//! Mood directive embedded in assistant text.
//!
//! The model is asked to add a line `MOOD_LOG:<mood>,<intensity>[,<note>]`
//! to its answer. That line must never reach the user: the extractor removes
//! it from the text stream and hands the parsed record to a [`MoodSink`].

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MOOD_MARKER: &str = "MOOD_LOG:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodDirective {
    pub mood: String,
    /// 1..=5
    pub intensity: u8,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("line does not start with `MOOD_LOG:`")]
    MissingMarker,
    #[error("expected `,` after the mood name")]
    MissingSeparator,
    #[error("mood name must contain letters only, got `{0}`")]
    InvalidMood(String),
    #[error("intensity must be a single digit from 1 to 5, got `{0}`")]
    InvalidIntensity(String),
}

/// Parses one directive line, marker included, without its line terminator.
impl FromStr for MoodDirective {
    type Err = DirectiveError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let body = line
            .strip_prefix(MOOD_MARKER)
            .ok_or(DirectiveError::MissingMarker)?;

        let (mood, rest) = body
            .split_once(',')
            .ok_or(DirectiveError::MissingSeparator)?;
        let mood = mood.trim();
        if mood.is_empty() || !mood.chars().all(char::is_alphabetic) {
            return Err(DirectiveError::InvalidMood(mood.to_string()));
        }

        let (intensity, note) = match rest.split_once(',') {
            Some((intensity, note)) => (intensity, Some(note)),
            None => (rest, None),
        };
        let intensity = intensity.trim();
        let intensity = match intensity.as_bytes() {
            [digit @ b'1'..=b'5'] => digit - b'0',
            _ => return Err(DirectiveError::InvalidIntensity(intensity.to_string())),
        };

        let note = note
            .map(str::trim)
            .filter(|note| !note.is_empty())
            .map(str::to_string);

        Ok(Self {
            mood: mood.to_lowercase(),
            intensity,
            note,
        })
    }
}

/// Receives parsed directives. Implementations must not block.
pub trait MoodSink {
    fn submit(&self, directive: MoodDirective);
}

impl<T: MoodSink + ?Sized> MoodSink for &T {
    fn submit(&self, directive: MoodDirective) {
        (**self).submit(directive);
    }
}

impl<T: MoodSink + ?Sized> MoodSink for Arc<T> {
    fn submit(&self, directive: MoodDirective) {
        (**self).submit(directive);
    }
}

/// Result of one extraction step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// User-visible text. May be empty.
    pub clean: String,
    pub directive: Option<MoodDirective>,
}

pub struct DirectiveExtractor<S> {
    sink: S,
    /// Text held back: a possible marker prefix, or a directive line still
    /// waiting for its newline.
    carry: String,
    /// Last character already consumed, used to decide word boundaries
    /// at the start of the next fragment.
    prev_char: Option<char>,
    delivered: bool,
}

impl<S: MoodSink> DirectiveExtractor<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            carry: String::new(),
            prev_char: None,
            delivered: false,
        }
    }

    /// Whether a directive already went to the sink during this turn.
    #[cfg(test)]
    pub fn delivered(&self) -> bool {
        self.delivered
    }

    pub fn push(&mut self, fragment: &str) -> Extraction {
        let mut text = std::mem::take(&mut self.carry);
        text.push_str(fragment);
        self.process(text, false)
    }

    /// End of stream: release held text, parsing a trailing directive line.
    pub fn finish(&mut self) -> Extraction {
        let text = std::mem::take(&mut self.carry);
        self.process(text, true)
    }

    /// Forget held text without emitting it.
    pub fn discard(&mut self) {
        self.carry.clear();
    }

    fn process(&mut self, text: String, at_end: bool) -> Extraction {
        let mut extraction = Extraction::default();
        let mut rest = text.as_str();

        loop {
            match rest.find(MOOD_MARKER) {
                Some(start) => {
                    extraction.clean.push_str(&rest[..start]);
                    let line = &rest[start..];
                    match line.find('\n') {
                        Some(newline) => {
                            self.handle_line(&line[..newline], &mut extraction);
                            rest = &line[newline + 1..];
                        }
                        None if at_end => {
                            self.handle_line(line, &mut extraction);
                            rest = "";
                        }
                        None => {
                            self.carry = line.to_string();
                            break;
                        }
                    }
                }
                None => {
                    let keep = if at_end { 0 } else { self.marker_prefix_len(rest) };
                    let split = rest.len() - keep;
                    extraction.clean.push_str(&rest[..split]);
                    self.carry = rest[split..].to_string();
                    break;
                }
            }
        }

        let consumed = &text[..text.len() - self.carry.len()];
        if let Some(last) = consumed.chars().next_back() {
            self.prev_char = Some(last);
        }
        extraction
    }

    fn handle_line(&mut self, line: &str, extraction: &mut Extraction) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        match line.parse::<MoodDirective>() {
            Ok(_) if self.delivered => {
                log::warn!("Ignoring additional mood directive in the same turn");
            }
            Ok(directive) => {
                self.sink.submit(directive.clone());
                self.delivered = true;
                extraction.directive = Some(directive);
            }
            Err(err) => {
                log::debug!("Dropping malformed mood directive: {err}");
            }
        }
    }

    /// Length of a trailing proper prefix of the marker that starts at a word boundary.
    fn marker_prefix_len(&self, text: &str) -> usize {
        for len in (1..MOOD_MARKER.len()).rev() {
            if text.ends_with(&MOOD_MARKER[..len]) {
                let start = text.len() - len;
                let before = text[..start].chars().next_back().or(self.prev_char);
                let at_boundary = before.is_none_or(|c| !c.is_alphanumeric());
                return if at_boundary { len } else { 0 };
            }
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<MoodDirective>>);

    impl MoodSink for RecordingSink {
        fn submit(&self, directive: MoodDirective) {
            self.0.lock().unwrap().push(directive);
        }
    }

    impl RecordingSink {
        fn taken(&self) -> Vec<MoodDirective> {
            self.0.lock().unwrap().clone()
        }
    }

    fn run(fragments: &[&str]) -> (Vec<String>, Vec<MoodDirective>) {
        let sink = RecordingSink::default();
        let mut extractor = DirectiveExtractor::new(&sink);
        let mut out = Vec::new();
        for fragment in fragments {
            let extraction = extractor.push(fragment);
            if !extraction.clean.is_empty() {
                out.push(extraction.clean);
            }
        }
        let tail = extractor.finish();
        if !tail.clean.is_empty() {
            out.push(tail.clean);
        }
        (out, sink.taken())
    }

    #[test]
    fn parses_full_directive() {
        let directive: MoodDirective = "MOOD_LOG:Happy ,4, great day ".parse().unwrap();
        assert_eq!(
            directive,
            MoodDirective {
                mood: "happy".to_string(),
                intensity: 4,
                note: Some("great day".to_string()),
            }
        );
    }

    #[test]
    fn note_is_optional() {
        let bare: MoodDirective = "MOOD_LOG:calm,2".parse().unwrap();
        assert_eq!(bare.note, None);

        let empty: MoodDirective = "MOOD_LOG:calm,2,   ".parse().unwrap();
        assert_eq!(empty.note, None);

        let commas: MoodDirective = "MOOD_LOG:sad,3,lost keys, missed bus".parse().unwrap();
        assert_eq!(commas.note.as_deref(), Some("lost keys, missed bus"));
    }

    #[test]
    fn rejects_malformed_directives() {
        assert_eq!(
            "mood:happy,3".parse::<MoodDirective>(),
            Err(DirectiveError::MissingMarker)
        );
        assert_eq!(
            "MOOD_LOG:happy".parse::<MoodDirective>(),
            Err(DirectiveError::MissingSeparator)
        );
        assert!(matches!(
            "MOOD_LOG:very_happy,3".parse::<MoodDirective>(),
            Err(DirectiveError::InvalidMood(_))
        ));
        assert!(matches!(
            "MOOD_LOG:,3".parse::<MoodDirective>(),
            Err(DirectiveError::InvalidMood(_))
        ));
        for bad in ["MOOD_LOG:sad,0", "MOOD_LOG:sad,6", "MOOD_LOG:sad,42", "MOOD_LOG:sad,x", "MOOD_LOG:sad,3x"] {
            assert!(
                matches!(bad.parse::<MoodDirective>(), Err(DirectiveError::InvalidIntensity(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn text_without_marker_passes_through_unchanged() {
        let fragments = ["Hello", " there,", " how are you?\n", "Take a deep breath.", " 🌿"];
        let (out, directives) = run(&fragments);

        assert_eq!(out, fragments.to_vec());
        assert!(directives.is_empty());
    }

    #[test]
    fn strips_directive_and_keeps_surrounding_text() {
        let (out, directives) = run(&["Feeling good.\nMOOD_LOG:happy,4,great day\n"]);

        assert_eq!(out, vec!["Feeling good.\n"]);
        assert_eq!(
            directives,
            vec![MoodDirective {
                mood: "happy".to_string(),
                intensity: 4,
                note: Some("great day".to_string()),
            }]
        );
    }

    #[test]
    fn keeps_text_after_the_directive_line() {
        let (out, directives) = run(&["That sounds hard.\nMOOD_LOG:sad,3\r\nWant to talk about it?"]);

        assert_eq!(out.concat(), "That sounds hard.\nWant to talk about it?");
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].mood, "sad");
    }

    #[test]
    fn reconstructs_directive_split_across_fragments() {
        let (out, directives) = run(&[
            "I hear you.\nMO",
            "OD_",
            "LOG:anx",
            "ious,5,exam tomorrow",
            "\nBreathe with me.",
        ]);

        assert_eq!(out.concat(), "I hear you.\nBreathe with me.");
        assert!(!out.concat().contains("MOOD"));
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].mood, "anxious");
        assert_eq!(directives[0].intensity, 5);
        assert_eq!(directives[0].note.as_deref(), Some("exam tomorrow"));
    }

    #[test]
    fn trailing_directive_is_parsed_at_end_of_stream() {
        let (out, directives) = run(&["Glad to hear it!\n", "MOOD_LOG:excited,5,new job"]);

        assert_eq!(out.concat(), "Glad to hear it!\n");
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].note.as_deref(), Some("new job"));
    }

    #[test]
    fn malformed_directive_line_is_dropped_silently() {
        let (out, directives) = run(&["Okay.\nMOOD_LOG:meh,eleven,??\nTake care."]);

        assert_eq!(out.concat(), "Okay.\nTake care.");
        assert!(directives.is_empty());
    }

    #[test]
    fn only_the_first_directive_of_a_turn_reaches_the_sink() {
        let (out, directives) = run(&["MOOD_LOG:happy,4\nHi\nMOOD_LOG:sad,2\n"]);

        assert_eq!(out.concat(), "Hi\n");
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].mood, "happy");
    }

    #[test]
    fn marker_lookalike_inside_a_word_is_not_held() {
        let sink = RecordingSink::default();
        let mut extractor = DirectiveExtractor::new(&sink);

        assert_eq!(extractor.push("I AM").clean, "I AM");
        assert_eq!(extractor.push(" M").clean, " ");
        assert_eq!(extractor.push("aybe").clean, "Maybe");
    }

    #[test]
    fn directive_is_submitted_before_the_clean_text_is_returned() {
        let sink = RecordingSink::default();
        let mut extractor = DirectiveExtractor::new(&sink);

        let extraction = extractor.push("Noted.\nMOOD_LOG:calm,2,tea\n");
        assert_eq!(sink.taken().len(), 1);
        assert_eq!(extraction.directive, sink.taken().first().cloned());
        assert!(extractor.delivered());
    }
}
