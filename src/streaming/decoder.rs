//! Incremental decoder for `data: {json}` event streams.
//!
//! Chunks arrive at arbitrary byte boundaries. The decoder keeps one pending
//! line buffer per stream, splits complete lines off its front and turns every
//! well-formed data frame into a [`StreamDelta`].

use serde::Deserialize;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// Held payloads beyond this size are treated as garbage.
const MAX_HELD_PAYLOAD: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Nothing buffered.
    Idle,
    /// A partial line, an incomplete UTF-8 sequence or an unparsed payload is pending.
    Buffering,
    /// `[DONE]` was seen or the input ended. Nothing more will be yielded.
    Complete,
}

/// One decoded text fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDelta {
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

enum Payload {
    Done,
    Content(Option<String>),
}

enum LineOutcome {
    Skip,
    Delta(String),
    Done,
    /// Payload did not parse; stop decoding until more bytes arrive.
    Stall,
}

fn parse_payload(payload: &str) -> Result<Payload, serde_json::Error> {
    if payload == DONE_SENTINEL {
        return Ok(Payload::Done);
    }
    let chunk: CompletionChunk = serde_json::from_str(payload)?;
    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content);
    Ok(Payload::Content(content))
}

pub struct StreamFrameDecoder {
    state: DecoderState,
    /// Decoded text not yet split into lines.
    pending: String,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    utf8_tail: Vec<u8>,
    /// Payload that failed to parse, waiting to be recombined with the next line.
    held: Option<String>,
}

impl Default for StreamFrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamFrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Idle,
            pending: String::new(),
            utf8_tail: Vec::new(),
            held: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == DecoderState::Complete
    }

    /// Bytes and characters currently held back, for diagnostics.
    #[cfg(test)]
    pub fn buffered_len(&self) -> usize {
        self.pending.len() + self.utf8_tail.len() + self.held.as_ref().map_or(0, String::len)
    }

    /// Feed one chunk and collect the deltas it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamDelta> {
        if self.is_complete() {
            return Vec::new();
        }

        self.decode_bytes(chunk);
        let deltas = self.drain_lines(false);
        self.refresh_state();
        deltas
    }

    /// End of input: give the residue one best-effort pass and mark the stream complete.
    pub fn finish(&mut self) -> Vec<StreamDelta> {
        if self.is_complete() {
            return Vec::new();
        }

        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.pending.push_str(&String::from_utf8_lossy(&tail));
        }

        let mut deltas = self.drain_lines(true);
        if !self.is_complete() && !self.pending.is_empty() {
            let last_line = std::mem::take(&mut self.pending);
            let last_line = last_line.strip_suffix('\r').unwrap_or(&last_line);
            if let LineOutcome::Delta(text) = self.process_line(last_line, true) {
                deltas.push(StreamDelta { text });
            }
        }

        if let Some(held) = self.held.take() {
            log::debug!("Dropping {} bytes of unparsable stream payload", held.len());
        }
        self.release();
        self.state = DecoderState::Complete;
        deltas
    }

    /// Drop every buffer so the decoder can serve a fresh stream.
    pub fn reset(&mut self) {
        self.release();
        self.state = DecoderState::Idle;
    }

    fn release(&mut self) {
        self.pending = String::new();
        self.utf8_tail = Vec::new();
        self.held = None;
    }

    fn decode_bytes(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.pending.push_str(text);
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    self.pending
                        .push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match err.error_len() {
                        Some(invalid) => {
                            self.pending.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + invalid..];
                        }
                        None => {
                            self.utf8_tail = rest[valid..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self, final_pass: bool) -> Vec<StreamDelta> {
        let mut deltas = Vec::new();

        while let Some(newline) = self.pending.find('\n') {
            let mut line: String = self.pending.drain(..=newline).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }

            match self.process_line(&line, final_pass) {
                LineOutcome::Skip => {}
                LineOutcome::Delta(text) => deltas.push(StreamDelta { text }),
                LineOutcome::Done => {
                    self.release();
                    self.state = DecoderState::Complete;
                    break;
                }
                LineOutcome::Stall => break,
            }
        }

        deltas
    }

    fn process_line(&mut self, line: &str, final_pass: bool) -> LineOutcome {
        if line.trim().is_empty() || line.starts_with(':') {
            return LineOutcome::Skip;
        }

        if let Some(held) = self.held.take() {
            return self.recombine(held, line, final_pass);
        }

        let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
            return LineOutcome::Skip;
        };
        let payload = rest.trim();

        match parse_payload(payload) {
            Ok(payload) => Self::accept(payload),
            Err(err) if final_pass => {
                log::debug!("Ignoring malformed trailing frame: {err}");
                LineOutcome::Skip
            }
            Err(err) => {
                log::debug!("Holding malformed frame for recombination: {err}");
                self.held = Some(payload.to_string());
                LineOutcome::Stall
            }
        }
    }

    fn recombine(&mut self, held: String, line: &str, final_pass: bool) -> LineOutcome {
        let joined = format!("{held}{line}");
        if let Ok(payload) = parse_payload(joined.trim()) {
            return Self::accept(payload);
        }

        // The next line stands on its own, so the held payload was garbage.
        if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
            if let Ok(payload) = parse_payload(rest.trim()) {
                log::debug!("Dropping {} bytes of unparsable stream payload", held.len());
                return Self::accept(payload);
            }
        }

        if final_pass {
            return LineOutcome::Skip;
        }
        if joined.len() > MAX_HELD_PAYLOAD {
            log::warn!(
                "Discarding {} bytes of stream payload that never parsed",
                joined.len()
            );
            return LineOutcome::Skip;
        }

        self.held = Some(joined);
        LineOutcome::Stall
    }

    fn accept(payload: Payload) -> LineOutcome {
        match payload {
            Payload::Done => LineOutcome::Done,
            Payload::Content(Some(text)) if !text.is_empty() => LineOutcome::Delta(text),
            Payload::Content(_) => LineOutcome::Skip,
        }
    }

    fn refresh_state(&mut self) {
        if self.is_complete() {
            return;
        }
        self.state = if self.pending.is_empty() && self.utf8_tail.is_empty() && self.held.is_none()
        {
            DecoderState::Idle
        } else {
            DecoderState::Buffering
        };
    }
}
