pub mod checkin;
pub mod queue;
pub mod trends;

pub use checkin::MoodCheckIn;
pub use queue::{MoodQueue, TurnMoodSink};
pub use trends::MoodTrends;
