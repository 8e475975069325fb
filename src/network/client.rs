use std::collections::VecDeque;
use std::sync::Arc;

use futures::StreamExt;
use reqwest::Response;
use tokio::sync::mpsc;

use crate::common::types::{CONNECTION_ERROR_NOTICE, FALLBACK_REPLY};
use crate::common::{ChatCommand, ChatEvent, ChatMessage, TurnSummary};
use crate::config::AppConfig;
use crate::error::{CompanionError, Result};
use crate::mood::{MoodCheckIn, MoodQueue, MoodTrends, TurnMoodSink};
use crate::storage::models::ChatSession;
use crate::storage::{ChatDatabase, MediaUploader};
use crate::streaming::{MessageSink, StreamEnd, StreamPipeline};

use super::gateway::ChatGateway;

/// Persists the finalized assistant message into its session.
struct SessionMessages<'a> {
    db: &'a ChatDatabase,
    session_id: &'a str,
}

impl MessageSink for SessionMessages<'_> {
    fn persist(&self, message: &ChatMessage) {
        if let Err(err) = self.db.insert_message(self.session_id, message) {
            log::error!("Failed to store assistant message: {err}");
        }
    }
}

/// Backend task: owns storage and the chat endpoint, serves UI commands.
pub struct ChatBackend {
    event_sender: mpsc::Sender<ChatEvent>,
    command_receiver: mpsc::Receiver<ChatCommand>,
    gateway: ChatGateway,
    db: Arc<ChatDatabase>,
    moods: MoodQueue,
    uploader: MediaUploader,
    history_window: usize,
    current_session: Option<String>,
    /// Stored messages of the current session, oldest first.
    history: Vec<ChatMessage>,
    /// Active sidebar filter; refreshed lists keep applying it.
    search_query: String,
    /// Commands that arrived while a reply was streaming.
    deferred: VecDeque<ChatCommand>,
    commands_open: bool,
}

impl ChatBackend {
    pub fn new(
        event_sender: mpsc::Sender<ChatEvent>,
        command_receiver: mpsc::Receiver<ChatCommand>,
        config: &AppConfig,
        db: Arc<ChatDatabase>,
        moods: MoodQueue,
    ) -> Result<Self> {
        Ok(Self {
            event_sender,
            command_receiver,
            gateway: ChatGateway::new(config)?,
            db,
            moods,
            uploader: MediaUploader::new(&config.uploads_dir),
            history_window: config.history_window,
            current_session: None,
            history: Vec::new(),
            search_query: String::new(),
            deferred: VecDeque::new(),
            commands_open: true,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        self.refresh_sessions().await?;
        self.refresh_trends().await?;
        self.refresh_library().await?;
        log::info!("Chat backend started");

        loop {
            let command = match self.deferred.pop_front() {
                Some(command) => command,
                None if !self.commands_open => break,
                None => match self.command_receiver.recv().await {
                    Some(command) => command,
                    None => break,
                },
            };

            if let Err(err) = self.handle_command(command).await {
                log::error!("Command failed: {err}");
                let notice = match err {
                    CompanionError::Validation(message) => message,
                    other => other.to_string(),
                };
                self.emit(ChatEvent::Notice(notice)).await;
            }
        }

        log::info!("Chat backend stopped");
        Ok(())
    }

    async fn handle_command(&mut self, command: ChatCommand) -> Result<()> {
        match command {
            ChatCommand::SendMessage(content) => self.handle_send(content).await,
            ChatCommand::CancelTurn => {
                log::debug!("No reply is streaming; nothing to cancel");
                Ok(())
            }
            ChatCommand::NewSession => {
                self.reset_session().await;
                Ok(())
            }
            ChatCommand::SelectSession(session_id) => {
                let history = self.db.session_messages(&session_id)?;
                self.current_session = Some(session_id.clone());
                self.history = history.clone();
                self.emit(ChatEvent::SessionSelected {
                    session_id: Some(session_id),
                    history,
                })
                .await;
                Ok(())
            }
            ChatCommand::DeleteSession(session_id) => {
                if self.db.delete_session(&session_id)? {
                    log::info!("Deleted session {session_id}");
                }
                if self.current_session.as_deref() == Some(session_id.as_str()) {
                    self.reset_session().await;
                }
                self.refresh_sessions().await?;
                self.refresh_library().await
            }
            ChatCommand::SearchSessions(query) => {
                self.search_query = query.trim().to_string();
                self.refresh_sessions().await
            }
            ChatCommand::LogMood(check_in) => self.log_mood(check_in).await,
            ChatCommand::UploadMedia(path) => {
                let item = self
                    .uploader
                    .upload(&self.db, self.current_session.as_deref(), &path)?;
                self.emit(ChatEvent::Notice(format!("Uploaded {}", item.file_name)))
                    .await;
                self.refresh_library().await
            }
            ChatCommand::RefreshTrends => self.refresh_trends().await,
            ChatCommand::RefreshLibrary => self.refresh_library().await,
        }
    }

    async fn handle_send(&mut self, content: String) -> Result<()> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Ok(());
        }

        let session_id = match &self.current_session {
            Some(session_id) => session_id.clone(),
            None => {
                let session = self.db.create_session(&ChatSession::title_from(&content))?;
                self.current_session = Some(session.id.clone());
                self.emit(ChatEvent::SessionCreated(session.clone())).await;
                session.id
            }
        };

        let user_message = ChatMessage::user(content.as_str());
        self.db.insert_message(&session_id, &user_message)?;
        self.emit(ChatEvent::UserMessage(user_message.clone())).await;

        // From here on the turn always ends with exactly one TurnFinished.
        let window_start = self.history.len().saturating_sub(self.history_window);
        let context = self.history[window_start..].to_vec();
        self.history.push(user_message);

        let mut pipeline = StreamPipeline::new(self.moods.for_session(Some(session_id.clone())));
        let end = match self.gateway.open_stream(&content, &context).await {
            Ok(response) => self.pump(response, &mut pipeline).await,
            Err(err) if err.is_transport() => {
                log::error!("Could not reach chat endpoint: {err}");
                StreamEnd::TransportFailed(err.to_string())
            }
            Err(err) => {
                log::error!("Chat request not sent: {err}");
                StreamEnd::NotStarted(err.to_string())
            }
        };

        let outcome = pipeline.finish(
            end,
            &SessionMessages {
                db: &self.db,
                session_id: &session_id,
            },
        );
        if let Some(message) = &outcome.message {
            self.history.push(message.clone());
        }
        if let Some(directive) = &outcome.directive {
            log::debug!("Turn carried mood `{}`", directive.mood);
        }

        let fallback = match &outcome.end {
            StreamEnd::TransportFailed(reason) => {
                log::warn!("Assistant reply interrupted: {reason}");
                self.emit(ChatEvent::ConnectionError(CONNECTION_ERROR_NOTICE.to_string()))
                    .await;
                Some(ChatMessage::assistant(FALLBACK_REPLY))
            }
            StreamEnd::Cancelled => {
                log::info!("Assistant reply cancelled");
                None
            }
            StreamEnd::NotStarted(reason) => {
                self.emit(ChatEvent::Notice(reason.clone())).await;
                None
            }
            StreamEnd::Completed => None,
        };

        if let Err(err) = self.db.touch_session(&session_id) {
            log::warn!("Failed to update session timestamp: {err}");
        }

        self.emit(ChatEvent::TurnFinished(TurnSummary {
            message: outcome.message,
            fallback,
            end: outcome.end,
        }))
        .await;

        if let Err(err) = self.refresh_sessions().await {
            log::warn!("Failed to reload sessions: {err}");
        }
        Ok(())
    }

    /// Read the response body into the pipeline until it completes, fails or is cancelled.
    async fn pump(
        &mut self,
        response: Response,
        pipeline: &mut StreamPipeline<TurnMoodSink>,
    ) -> StreamEnd {
        let mut body = Box::pin(response.bytes_stream());

        loop {
            tokio::select! {
                chunk = body.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for text in pipeline.feed(&bytes) {
                            self.emit(ChatEvent::AssistantDelta(text)).await;
                        }
                        if pipeline.is_complete() {
                            return StreamEnd::Completed;
                        }
                    }
                    Some(Err(err)) => {
                        log::error!("Chat stream failed: {err}");
                        return StreamEnd::TransportFailed(err.to_string());
                    }
                    None => return StreamEnd::Completed,
                },
                command = self.command_receiver.recv(), if self.commands_open => match command {
                    Some(ChatCommand::CancelTurn) => return StreamEnd::Cancelled,
                    Some(ChatCommand::SendMessage(_)) => {
                        log::warn!("Ignoring message sent while a reply is streaming");
                    }
                    Some(other) => self.deferred.push_back(other),
                    None => self.commands_open = false,
                },
            }
        }
    }

    async fn log_mood(&mut self, check_in: MoodCheckIn) -> Result<()> {
        let entry = check_in.into_entry(self.current_session.clone())?;
        let stored = self.db.insert_mood(&entry)?;
        log::info!("Mood check-in `{}` ({}/10)", stored.mood, stored.intensity);
        self.emit(ChatEvent::Notice("Mood logged".to_string())).await;
        self.refresh_trends().await
    }

    async fn reset_session(&mut self) {
        self.current_session = None;
        self.history.clear();
        self.emit(ChatEvent::SessionSelected {
            session_id: None,
            history: Vec::new(),
        })
        .await;
    }

    async fn refresh_sessions(&self) -> Result<()> {
        let sessions = self.db.search_sessions(&self.search_query)?;
        self.emit(ChatEvent::SessionsLoaded(sessions)).await;
        Ok(())
    }

    async fn refresh_trends(&self) -> Result<()> {
        let trends = MoodTrends::from_entries(&self.db.mood_entries()?);
        self.emit(ChatEvent::TrendsLoaded(trends)).await;
        Ok(())
    }

    async fn refresh_library(&self) -> Result<()> {
        let items = self.db.media_library()?;
        self.emit(ChatEvent::LibraryLoaded(items)).await;
        Ok(())
    }

    async fn emit(&self, event: ChatEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::debug!("UI is gone; dropping {:?}", err.0);
        }
    }
}
