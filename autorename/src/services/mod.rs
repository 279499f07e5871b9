//! Collaborator contracts consumed by the rename pipeline.
//!
//! The pipeline only talks to the outside world through these traits. The
//! production implementations are the Telegram client, the JSON preference
//! store, `ffprobe` and the `image`-based normalizer; tests substitute fakes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::Result;
use crate::event::MediaKind;

/// Receives byte counts while a transfer is running.
#[async_trait]
pub trait ProgressSink: Send {
    async fn on_progress(&mut self, current: u64, total: u64);
}

/// Sink that ignores all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

#[async_trait]
impl ProgressSink for NoProgress {
    async fn on_progress(&mut self, _current: u64, _total: u64) {}
}

/// Per-user and per-chat settings read by the pipeline.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn format_template(&self, user_id: i64) -> Result<Option<String>>;
    async fn caption_template(&self, chat_id: i64) -> Result<Option<String>>;
    async fn media_preference(&self, user_id: i64) -> Result<Option<MediaKind>>;
    /// Transport reference of the chat's custom thumbnail.
    async fn thumbnail(&self, chat_id: i64) -> Result<Option<String>>;

    async fn set_format_template(&self, user_id: i64, template: Option<String>) -> Result<()>;
    async fn set_caption_template(&self, chat_id: i64, template: Option<String>) -> Result<()>;
    async fn set_media_preference(&self, user_id: i64, kind: Option<MediaKind>) -> Result<()>;
    async fn set_thumbnail(&self, chat_id: i64, reference: Option<String>) -> Result<()>;
}

/// Everything needed to send the renamed file back.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub chat_id: i64,
    pub reply_to: Option<i64>,
    pub path: &'a Path,
    pub file_name: &'a str,
    pub thumbnail: Option<&'a Path>,
    pub caption: &'a str,
    pub duration: Option<u64>,
}

/// Binary transfer primitives.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stream the binary behind `source` into `path`.
    ///
    /// `size_hint` is the size reported with the event, used as the progress
    /// total when the transfer itself does not announce one.
    async fn download_to_path(
        &self,
        source: &str,
        size_hint: u64,
        path: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<()>;

    async fn upload_document(
        &self,
        request: &UploadRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<()>;

    async fn upload_video(
        &self,
        request: &UploadRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<()>;

    async fn upload_audio(
        &self,
        request: &UploadRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<()>;

    /// Fetch a thumbnail image into `path`.
    async fn download_thumbnail(&self, reference: &str, path: &Path) -> Result<()>;
}

/// A message the bot sent and may later edit or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusHandle {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Text messages shown to the requester.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn reply(&self, chat_id: i64, reply_to: Option<i64>, text: &str) -> Result<StatusHandle>;
    async fn edit(&self, handle: &StatusHandle, text: &str) -> Result<()>;
    async fn delete(&self, handle: &StatusHandle) -> Result<()>;
}

/// Media duration lookup.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Whole seconds, or `None` if the file could not be probed.
    async fn probe_duration(&self, path: &Path) -> Option<u64>;
}

/// Thumbnail decoding, conversion and resizing.
#[async_trait]
pub trait ImageNormalizer: Send + Sync {
    /// Normalize the image at `path` and return where the result lives.
    async fn normalize(&self, path: &Path) -> Result<PathBuf>;
}
