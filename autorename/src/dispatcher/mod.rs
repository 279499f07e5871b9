//! Routes Bot API updates to preference commands or the rename pipeline.
//!
//! Every update runs in its own task on a [`TaskTracker`]; tasks share only
//! the debounce gate inside the pipeline and the preference store.

mod commands;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

pub use commands::Command;
use commands::{AUTORENAME_USAGE, SET_CAPTION_USAGE, SET_MEDIA_USAGE, START_TEXT};

use crate::Result;
use crate::event::{FileEvent, MediaKind};
use crate::pipeline::{RenamePipeline, SessionOutcome};
use crate::services::{Messenger, PreferenceStore};
use crate::telegram::{Message, TelegramClient, Update};

const UNSUPPORTED_TEXT: &str = "Unsupported file type. Send a document, video or audio file.";
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// What an inbound message asks for.
#[derive(Debug)]
pub enum Route {
    Command(Command),
    /// A photo to store as the chat's thumbnail.
    Thumbnail(String),
    Media(FileEvent),
    Unsupported,
    Ignore,
}

/// Classify a message. Only private chats are served.
pub fn route(message: &Message) -> Route {
    if !message.is_private() {
        return Route::Ignore;
    }

    if let Some(command) = message.text.as_deref().and_then(Command::parse) {
        return Route::Command(command);
    }

    if let Some(file_id) = message.largest_photo() {
        return Route::Thumbnail(file_id.to_string());
    }

    if let Some((kind, media)) = message.media() {
        return Route::Media(FileEvent::from_media(
            kind,
            media,
            message.sender_id(),
            message.chat.id,
            message.message_id,
        ));
    }

    if message.has_unsupported_media() {
        return Route::Unsupported;
    }

    Route::Ignore
}

#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<TelegramClient>,
    preferences: Arc<dyn PreferenceStore>,
    pipeline: Arc<RenamePipeline>,
    tracker: TaskTracker,
    poll_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        client: Arc<TelegramClient>,
        preferences: Arc<dyn PreferenceStore>,
        pipeline: Arc<RenamePipeline>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            client,
            preferences,
            pipeline,
            tracker: TaskTracker::new(),
            poll_timeout,
        }
    }

    /// Poll for updates until `cancel` fires, then wait for in-flight tasks.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut offset: Option<i64> = None;
        info!("Polling for updates");

        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => break,
                polled = self.client.poll_updates(offset, self.poll_timeout) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.spawn_update(update, &cancel);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to poll updates");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        info!(in_flight = self.tracker.len(), "Waiting for in-flight sessions");
        self.tracker.close();
        self.tracker.wait().await;
        Ok(())
    }

    fn spawn_update(&self, update: Update, cancel: &CancellationToken) {
        let Some(message) = update.message else {
            return;
        };
        let this = self.clone();
        let token = cancel.child_token();
        self.tracker.spawn(async move {
            this.handle_message(message, token).await;
        });
    }

    async fn handle_message(&self, message: Message, cancel: CancellationToken) {
        let chat_id = message.chat.id;
        let result = match route(&message) {
            Route::Command(command) => self.handle_command(command, &message).await,
            Route::Thumbnail(file_id) => self.save_thumbnail(chat_id, file_id, &message).await,
            Route::Media(event) => {
                match self.pipeline.handle(event, cancel).await {
                    SessionOutcome::Duplicate => debug!("Duplicate file ignored"),
                    SessionOutcome::Failed { phase, error } => {
                        debug!(%phase, error = %error, "Rename session failed")
                    }
                    SessionOutcome::MissingTemplate | SessionOutcome::Completed { .. } => {}
                }
                Ok(())
            }
            Route::Unsupported => self.say(&message, UNSUPPORTED_TEXT).await,
            Route::Ignore => Ok(()),
        };

        if let Err(e) = result {
            warn!(chat_id, error = %e, "Failed to handle message");
        }
    }

    async fn handle_command(&self, command: Command, message: &Message) -> Result<()> {
        let user_id = message.sender_id();
        let chat_id = message.chat.id;
        debug!(?command, user_id, "Handling command");

        match command {
            Command::Start => self.say(message, START_TEXT).await,
            Command::AutoRename(template) if template.is_empty() => {
                self.say(message, AUTORENAME_USAGE).await
            }
            Command::AutoRename(template) => {
                let text = format!("Your auto rename format has been updated to:\n{template}");
                self.preferences
                    .set_format_template(user_id, Some(template))
                    .await?;
                self.say(message, &text).await
            }
            Command::SetCaption(caption) if caption.is_empty() => {
                self.say(message, SET_CAPTION_USAGE).await
            }
            Command::SetCaption(caption) => {
                self.preferences
                    .set_caption_template(chat_id, Some(caption))
                    .await?;
                self.say(message, "Your caption has been saved").await
            }
            Command::DelCaption => {
                self.preferences.set_caption_template(chat_id, None).await?;
                self.say(message, "Your caption has been deleted").await
            }
            Command::SeeCaption => match self.preferences.caption_template(chat_id).await? {
                Some(caption) => {
                    self.say(message, &format!("Your caption:\n\n{caption}"))
                        .await
                }
                None => self.say(message, "You don't have a caption").await,
            },
            Command::SetMedia(arg) => match arg.parse::<MediaKind>() {
                Ok(kind) => {
                    self.preferences
                        .set_media_preference(user_id, Some(kind))
                        .await?;
                    self.say(message, &format!("Media preference set to: {kind}"))
                        .await
                }
                Err(_) => self.say(message, SET_MEDIA_USAGE).await,
            },
            Command::DelThumb => {
                self.preferences.set_thumbnail(chat_id, None).await?;
                self.say(message, "Your thumbnail has been deleted").await
            }
            Command::ViewThumb => match self.preferences.thumbnail(chat_id).await? {
                Some(file_id) => self.client.send_photo(chat_id, &file_id, None).await,
                None => self.say(message, "You don't have a thumbnail").await,
            },
        }
    }

    async fn save_thumbnail(&self, chat_id: i64, file_id: String, message: &Message) -> Result<()> {
        self.preferences.set_thumbnail(chat_id, Some(file_id)).await?;
        self.say(message, "Thumbnail saved").await
    }

    async fn say(&self, message: &Message, text: &str) -> Result<()> {
        self.client
            .reply(message.chat.id, Some(message.message_id), text)
            .await
            .map(|_| ())
    }
}
