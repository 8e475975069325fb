//! Assistant response streaming: frame decoding, mood directive extraction
//! and message accumulation.

pub mod accumulator;
pub mod decoder;
pub mod directive;
pub mod pipeline;

pub use accumulator::MessageSink;
pub use directive::{MoodDirective, MoodSink};
pub use pipeline::{StreamEnd, StreamPipeline};
