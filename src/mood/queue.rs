//! Background persistence of mood directives.
//!
//! The extractor submits synchronously; a worker task stores entries one by
//! one so the stream reader never waits on the database.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::ChatEvent;
use crate::error::Result;
use crate::storage::ChatDatabase;
use crate::storage::models::{MoodContext, MoodEntry, NewMoodEntry};
use crate::streaming::{MoodDirective, MoodSink};

pub trait MoodStore: Send + Sync + 'static {
    fn save_mood(&self, entry: &NewMoodEntry) -> Result<MoodEntry>;
}

impl MoodStore for ChatDatabase {
    fn save_mood(&self, entry: &NewMoodEntry) -> Result<MoodEntry> {
        Ok(self.insert_mood(entry)?)
    }
}

#[derive(Debug)]
struct MoodJob {
    session_id: Option<String>,
    directive: MoodDirective,
}

/// Outcome counters returned by the worker once the queue closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub persisted: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct MoodQueue {
    sender: mpsc::UnboundedSender<MoodJob>,
}

impl MoodQueue {
    /// Start the worker. It stops after every queue handle is dropped.
    pub fn spawn<St: MoodStore>(
        store: Arc<St>,
        events: Option<mpsc::Sender<ChatEvent>>,
    ) -> (Self, JoinHandle<QueueStats>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(store, receiver, events));
        (Self { sender }, worker)
    }

    pub fn enqueue(&self, session_id: Option<String>, directive: MoodDirective) {
        let job = MoodJob {
            session_id,
            directive,
        };
        if let Err(err) = self.sender.send(job) {
            log::error!("Mood queue is closed; dropping {:?}", err.0.directive);
        }
    }

    /// Sink bound to one conversation, for a single assistant turn.
    pub fn for_session(&self, session_id: Option<String>) -> TurnMoodSink {
        TurnMoodSink {
            queue: self.clone(),
            session_id,
        }
    }
}

pub struct TurnMoodSink {
    queue: MoodQueue,
    session_id: Option<String>,
}

impl MoodSink for TurnMoodSink {
    fn submit(&self, directive: MoodDirective) {
        self.queue.enqueue(self.session_id.clone(), directive);
    }
}

async fn run_worker<St: MoodStore>(
    store: Arc<St>,
    mut jobs: mpsc::UnboundedReceiver<MoodJob>,
    events: Option<mpsc::Sender<ChatEvent>>,
) -> QueueStats {
    let mut stats = QueueStats::default();

    while let Some(job) = jobs.recv().await {
        let entry = NewMoodEntry {
            session_id: job.session_id,
            mood: job.directive.mood.clone(),
            intensity: job.directive.intensity,
            note: job.directive.note.clone(),
            context: MoodContext::AiDetected,
        };

        let store = Arc::clone(&store);
        match tokio::task::spawn_blocking(move || store.save_mood(&entry)).await {
            Ok(Ok(stored)) => {
                stats.persisted += 1;
                log::info!("Logged mood `{}` ({}/5)", stored.mood, stored.intensity);
                if let Some(events) = &events {
                    if events.send(ChatEvent::MoodLogged(job.directive)).await.is_err() {
                        log::debug!("UI is gone; mood notification dropped");
                    }
                }
            }
            Ok(Err(err)) => {
                stats.failed += 1;
                log::error!("Failed to persist mood entry: {err}");
            }
            Err(err) => {
                stats.failed += 1;
                log::error!("Mood persistence task failed: {err}");
            }
        }
    }

    log::debug!(
        "Mood queue closed: {} persisted, {} failed",
        stats.persisted,
        stats.failed
    );
    stats
}
