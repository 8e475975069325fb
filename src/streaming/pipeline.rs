use crate::common::ChatMessage;

use super::accumulator::{ConversationAccumulator, MessageSink};
use super::decoder::StreamFrameDecoder;
use super::directive::{DirectiveExtractor, Extraction, MoodDirective, MoodSink};

/// How an assistant stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// `[DONE]` arrived or the body closed cleanly.
    Completed,
    /// The transport failed before completion.
    TransportFailed(String),
    /// The reader abandoned the stream.
    Cancelled,
    /// The request was never sent, e.g. the endpoint is not configured.
    NotStarted(String),
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub message: Option<ChatMessage>,
    pub directive: Option<MoodDirective>,
    pub end: StreamEnd,
}

/// One assistant turn: raw bytes in, clean deltas out.
///
/// [`StreamPipeline::finish`] consumes the pipeline, so every stream reports
/// its outcome exactly once.
pub struct StreamPipeline<S> {
    decoder: StreamFrameDecoder,
    extractor: DirectiveExtractor<S>,
    accumulator: ConversationAccumulator,
    directive: Option<MoodDirective>,
}

impl<S: MoodSink> StreamPipeline<S> {
    pub fn new(sink: S) -> Self {
        Self {
            decoder: StreamFrameDecoder::new(),
            extractor: DirectiveExtractor::new(sink),
            accumulator: ConversationAccumulator::new(),
            directive: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.decoder.is_complete()
    }

    /// The in-flight assistant message so far.
    #[cfg(test)]
    pub fn message(&self) -> Option<&ChatMessage> {
        self.accumulator.message()
    }

    /// Feed one raw chunk; returns the clean text appended to the message.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut appended = Vec::new();
        for delta in self.decoder.push(chunk) {
            self.absorb(&delta.text, &mut appended);
        }
        appended
    }

    pub fn finish(mut self, end: StreamEnd, messages: &impl MessageSink) -> TurnOutcome {
        if end == StreamEnd::Cancelled {
            self.decoder.reset();
            self.extractor.discard();
        } else {
            let mut ignored = Vec::new();
            for delta in self.decoder.finish() {
                self.absorb(&delta.text, &mut ignored);
            }
            let tail = self.extractor.finish();
            self.record(tail, &mut ignored);
        }

        let message = self.accumulator.finalize(messages).cloned();
        TurnOutcome {
            message,
            directive: self.directive,
            end,
        }
    }

    fn absorb(&mut self, text: &str, appended: &mut Vec<String>) {
        let extraction = self.extractor.push(text);
        self.record(extraction, appended);
    }

    fn record(&mut self, extraction: Extraction, appended: &mut Vec<String>) {
        if extraction.directive.is_some() {
            self.directive = extraction.directive;
        }
        if extraction.clean.is_empty() {
            return;
        }
        if let Err(err) = self.accumulator.append(&extraction.clean) {
            log::warn!("Dropping assistant text after finalization: {err}");
            return;
        }
        appended.push(extraction.clean);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        moods: Mutex<Vec<MoodDirective>>,
        messages: Mutex<Vec<String>>,
    }

    impl MoodSink for Recorder {
        fn submit(&self, directive: MoodDirective) {
            self.moods.lock().unwrap().push(directive);
        }
    }

    impl MessageSink for Recorder {
        fn persist(&self, message: &ChatMessage) {
            self.messages.lock().unwrap().push(message.content.clone());
        }
    }

    fn frame(content: &str) -> String {
        let body = serde_json::json!({ "choices": [{ "delta": { "content": content } }] });
        format!("data: {body}\n\n")
    }

    #[test]
    fn hi_there_split_across_three_chunks() {
        let recorder = Recorder::default();
        let mut pipeline = StreamPipeline::new(&recorder);

        let mut shown = Vec::new();
        shown.extend(pipeline.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi the"));
        shown.extend(pipeline.feed(b"re\"}}]}\n"));
        shown.extend(pipeline.feed(b"data: [DONE]\n"));
        assert!(pipeline.is_complete());

        let outcome = pipeline.finish(StreamEnd::Completed, &recorder);
        assert_eq!(shown, vec!["Hi there"]);
        assert_eq!(outcome.message.unwrap().content, "Hi there");
        assert!(outcome.directive.is_none());
        assert!(recorder.moods.lock().unwrap().is_empty());
        assert_eq!(*recorder.messages.lock().unwrap(), vec!["Hi there".to_string()]);
    }

    #[test]
    fn directive_is_removed_and_delivered() {
        let recorder = Recorder::default();
        let mut pipeline = StreamPipeline::new(&recorder);

        let shown = pipeline.feed(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Feeling good.\\nMOOD_LOG:happy,4,great day\\n\"}}]}\n",
        );
        assert_eq!(shown, vec!["Feeling good.\n"]);

        let outcome = pipeline.finish(StreamEnd::Completed, &recorder);
        let directive = outcome.directive.unwrap();
        assert_eq!(directive.mood, "happy");
        assert_eq!(directive.intensity, 4);
        assert_eq!(directive.note.as_deref(), Some("great day"));
        assert_eq!(recorder.moods.lock().unwrap().len(), 1);
        assert_eq!(outcome.message.unwrap().content, "Feeling good.\n");
    }

    #[test]
    fn displayed_text_is_independent_of_chunking() {
        let input = format!(
            "{}{}{}{}data: [DONE]\n",
            frame("I'm sorry the day was rough.\nMO"),
            frame("OD_LOG:sad,3,rough"),
            frame(" day\nWhat helped"),
            frame(" a little?")
        );
        let bytes = input.as_bytes();
        let expected = "I'm sorry the day was rough.\nWhat helped a little?";

        for split in (1..bytes.len()).step_by(3) {
            let recorder = Recorder::default();
            let mut pipeline = StreamPipeline::new(&recorder);
            let mut shown = pipeline.feed(&bytes[..split]);
            shown.extend(pipeline.feed(&bytes[split..]));
            let outcome = pipeline.finish(StreamEnd::Completed, &recorder);

            assert_eq!(shown.concat(), expected, "split at {split}");
            assert_eq!(outcome.message.unwrap().content, expected);
            let moods = recorder.moods.lock().unwrap();
            assert_eq!(moods.len(), 1);
            assert_eq!(moods[0].note.as_deref(), Some("rough day"));
        }
    }

    #[test]
    fn transport_failure_keeps_partial_text() {
        let recorder = Recorder::default();
        let mut pipeline = StreamPipeline::new(&recorder);
        pipeline.feed(frame("Let me think").as_bytes());
        pipeline.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\" about");

        let outcome = pipeline.finish(StreamEnd::TransportFailed("reset".into()), &recorder);
        assert_eq!(outcome.message.unwrap().content, "Let me think");
        assert_eq!(outcome.end, StreamEnd::TransportFailed("reset".into()));
    }

    #[test]
    fn cancelled_turn_drops_buffered_state() {
        let recorder = Recorder::default();
        let mut pipeline = StreamPipeline::new(&recorder);
        pipeline.feed(frame("Partial answer\nMOOD_LOG:calm,2").as_bytes());
        assert_eq!(pipeline.message().unwrap().content, "Partial answer\n");

        let outcome = pipeline.finish(StreamEnd::Cancelled, &recorder);
        assert_eq!(outcome.message.unwrap().content, "Partial answer\n");
        assert!(outcome.directive.is_none());
        assert!(recorder.moods.lock().unwrap().is_empty());
    }

    #[test]
    fn stream_without_content_yields_no_message() {
        let recorder = Recorder::default();
        let mut pipeline = StreamPipeline::new(&recorder);
        pipeline.feed(b": ping\n\ndata: [DONE]\n");

        let outcome = pipeline.finish(StreamEnd::Completed, &recorder);
        assert!(outcome.message.is_none());
        assert!(recorder.messages.lock().unwrap().is_empty());
    }
}
