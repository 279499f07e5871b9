//! Drives one [`FileEvent`] from admission to cleanup.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use media_naming::{EpisodeCascade, Extraction, extract_quality, render, split_extension};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use super::session::{Phase, TransferSession};
use crate::caption::{CaptionContext, render_caption};
use crate::config::PipelineConfig;
use crate::debounce::DebounceGate;
use crate::event::{FileEvent, MediaKind};
use crate::progress::ProgressReporter;
use crate::services::{
    ImageNormalizer, MediaProbe, Messenger, PreferenceStore, ProgressSink, StatusHandle,
    Transport, UploadRequest,
};
use crate::utils::filename::{MAX_EXTENSION_BYTES, sanitize_file_name};
use crate::utils::fs;
use crate::{Error, Result};

pub const MISSING_TEMPLATE_TEXT: &str =
    "Please set an auto rename format first using /autorename";
const DOWNLOADING_TEXT: &str = "Downloading...";
const UPLOADING_TEXT: &str = "Uploading...";
/// Rendered names never start with a dot, so this cannot collide with the
/// downloaded file.
const THUMBNAIL_FILE_NAME: &str = ".thumb.jpg";

/// Collaborators the pipeline talks to.
#[derive(Clone)]
pub struct PipelineServices {
    pub preferences: Arc<dyn PreferenceStore>,
    pub transport: Arc<dyn Transport>,
    pub messenger: Arc<dyn Messenger>,
    pub probe: Arc<dyn MediaProbe>,
    pub normalizer: Arc<dyn ImageNormalizer>,
}

/// How a call to [`RenamePipeline::handle`] ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The user has no format template; they were told to set one.
    MissingTemplate,
    /// Suppressed by the debounce gate.
    Duplicate,
    Completed { file_name: String },
    Failed { phase: Phase, error: Error },
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Where a file ends up and what it was derived from.
#[derive(Debug, Clone)]
pub struct RenamePlan {
    pub file_name: String,
    pub extraction: Extraction,
    pub work_dir: PathBuf,
    pub path: PathBuf,
}

/// Entry point for inbound media.
pub struct RenamePipeline {
    gate: Arc<DebounceGate>,
    services: PipelineServices,
    config: PipelineConfig,
    episodes: EpisodeCascade,
}

impl RenamePipeline {
    pub fn new(gate: Arc<DebounceGate>, services: PipelineServices, config: PipelineConfig) -> Self {
        let episodes = if config.track_number_fallback {
            EpisodeCascade::with_track_number_fallback()
        } else {
            EpisodeCascade::standard()
        };
        Self {
            gate,
            services,
            config,
            episodes,
        }
    }

    pub fn gate(&self) -> &Arc<DebounceGate> {
        &self.gate
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one inbound file.
    ///
    /// Cancelling `cancel` fails the current stage with [`Error::Cancelled`]
    /// and takes the same cleanup path as a transfer error.
    pub async fn handle(&self, event: FileEvent, cancel: CancellationToken) -> SessionOutcome {
        let span = info_span!("session", identity = %event.identity, user = event.user_id);
        self.handle_inner(event, cancel).instrument(span).await
    }

    async fn handle_inner(&self, event: FileEvent, cancel: CancellationToken) -> SessionOutcome {
        let template = match self.services.preferences.format_template(event.user_id).await {
            Ok(Some(template)) => template,
            Ok(None) => {
                self.notify(event.chat_id, event.message_id, MISSING_TEMPLATE_TEXT)
                    .await;
                return SessionOutcome::MissingTemplate;
            }
            Err(error) => {
                warn!(error = %error, "Failed to read format template");
                self.notify(event.chat_id, event.message_id, &format!("Error: {error}"))
                    .await;
                return SessionOutcome::Failed {
                    phase: Phase::Idle,
                    error,
                };
            }
        };

        if !self.gate.admit(&event.identity) {
            return SessionOutcome::Duplicate;
        }

        let mut session = TransferSession::new(event.identity.clone());
        let outcome = match self.admit_and_run(&mut session, &event, &template, &cancel).await {
            Ok(file_name) => {
                info!(file_name = %file_name, "Session completed");
                SessionOutcome::Completed { file_name }
            }
            Err((status, error)) => {
                let phase = session.phase();
                session.fail();
                if error.is_cancelled() {
                    info!(%phase, "Session cancelled");
                } else {
                    warn!(%phase, error = %error, "Session failed");
                }
                self.report_failure(&event, status, phase, &error).await;
                SessionOutcome::Failed { phase, error }
            }
        };

        session.cleanup().await;
        self.gate.stamp(&event.identity);
        outcome
    }

    /// Compute the rendered name and the session's private paths.
    pub fn plan(&self, event: &FileEvent, template: &str) -> RenamePlan {
        let extraction = Extraction {
            episode: self.episodes.extract(&event.name),
            quality: extract_quality(&event.name),
        };
        let rendered = render(template, &extraction, &event.name);
        let (_, extension) = split_extension(&event.name);
        let extension = if extension.len() <= MAX_EXTENSION_BYTES {
            extension
        } else {
            debug!(len = extension.len(), "Dropping oversized extension");
            ""
        };
        let file_name = format!(
            "{}{}",
            sanitize_file_name(&rendered, extension.len()),
            extension
        );

        let work_dir = self
            .config
            .download_dir
            .join(uuid::Uuid::new_v4().simple().to_string());
        let path = work_dir.join(&file_name);
        RenamePlan {
            file_name,
            extraction,
            work_dir,
            path,
        }
    }

    async fn admit_and_run(
        &self,
        session: &mut TransferSession,
        event: &FileEvent,
        template: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, (Option<StatusHandle>, Error)> {
        session.advance(Phase::Admitted).map_err(|e| (None, e))?;
        let plan = self.plan(event, template);
        debug!(
            file_name = %plan.file_name,
            episode = ?plan.extraction.episode,
            quality = %plan.extraction.quality,
            "Planned rename"
        );

        let status = self
            .services
            .messenger
            .reply(event.chat_id, Some(event.message_id), DOWNLOADING_TEXT)
            .await
            .map_err(|e| (None, e))?;

        run_session(session, event, &plan, &status, self, cancel)
            .await
            .map(|()| plan.file_name)
            .map_err(|e| (Some(status), e))
    }

    async fn report_failure(
        &self,
        event: &FileEvent,
        status: Option<StatusHandle>,
        phase: Phase,
        error: &Error,
    ) {
        let text = match phase {
            Phase::Downloading => error.to_string(),
            _ => format!("Error: {error}"),
        };
        match status {
            Some(handle) => {
                if let Err(e) = self.services.messenger.edit(&handle, &text).await {
                    warn!(error = %e, "Failed to report session failure");
                }
            }
            None => self.notify(event.chat_id, event.message_id, &text).await,
        }
    }

    async fn notify(&self, chat_id: i64, reply_to: i64, text: &str) {
        if let Err(e) = self
            .services
            .messenger
            .reply(chat_id, Some(reply_to), text)
            .await
        {
            warn!(error = %e, "Failed to send message");
        }
    }

    async fn output_kind(&self, event: &FileEvent) -> MediaKind {
        match self.services.preferences.media_preference(event.user_id).await {
            Ok(kind) => kind.unwrap_or(event.kind),
            Err(e) => {
                warn!(error = %e, "Failed to read media preference, using inbound kind");
                event.kind
            }
        }
    }

    async fn caption_template(&self, chat_id: i64) -> Option<String> {
        self.services
            .preferences
            .caption_template(chat_id)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read caption template, using default");
                None
            })
    }

    /// Fetch and normalize the thumbnail to attach, if any.
    async fn prepare_thumbnail(
        &self,
        session: &mut TransferSession,
        event: &FileEvent,
        output_kind: MediaKind,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>> {
        let custom = self
            .services
            .preferences
            .thumbnail(event.chat_id)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read custom thumbnail");
                None
            });

        let reference = match custom {
            Some(reference) => reference,
            None if output_kind == MediaKind::Video => match event.best_thumbnail() {
                Some(candidate) => candidate.reference.clone(),
                None => return Ok(None),
            },
            None => return Ok(None),
        };

        let path = work_dir.join(THUMBNAIL_FILE_NAME);
        session.track_thumbnail(path.clone());
        cancellable(
            cancel,
            self.services.transport.download_thumbnail(&reference, &path),
        )
        .await?;

        let normalized = cancellable(cancel, self.services.normalizer.normalize(&path)).await?;
        if normalized != path {
            session.discard_thumbnail().await;
            session.track_thumbnail(normalized.clone());
        }
        Ok(Some(normalized))
    }
}

/// Run the download → probe → thumbnail → upload stages for an admitted
/// session, then remove the status message and local artifacts.
///
/// On error the session is left in the phase that failed; the caller owns
/// reporting and the final cleanup.
pub async fn run_session(
    session: &mut TransferSession,
    event: &FileEvent,
    plan: &RenamePlan,
    status: &StatusHandle,
    pipeline: &RenamePipeline,
    cancel: &CancellationToken,
) -> Result<()> {
    let services = &pipeline.services;
    let interval = pipeline.config.progress_interval;

    session.advance(Phase::Downloading)?;
    session.track_work_dir(plan.work_dir.clone());
    session.track_download(plan.path.clone());
    fs::ensure_dir_all_with_op("creating session directory", &plan.work_dir).await?;
    {
        let mut progress =
            StatusProgress::new(services.messenger.as_ref(), *status, DOWNLOADING_TEXT, interval);
        cancellable(
            cancel,
            services
                .transport
                .download_to_path(&event.source, event.size, &plan.path, &mut progress),
        )
        .await?;
    }

    session.advance(Phase::Probing)?;
    let probed = cancellable(cancel, async {
        Ok(services.probe.probe_duration(&plan.path).await)
    })
    .await?;
    let duration = probed.or(event.duration_hint).unwrap_or(0);
    session.set_duration(duration);

    if let Err(e) = services.messenger.edit(status, UPLOADING_TEXT).await {
        debug!(error = %e, "Failed to update status message");
    }

    let output_kind = pipeline.output_kind(event).await;
    let caption_template = pipeline.caption_template(event.chat_id).await;
    let caption = render_caption(
        caption_template.as_deref(),
        &CaptionContext {
            file_name: &plan.file_name,
            file_size: event.size,
            duration_secs: duration,
            quality: &plan.extraction.quality,
        },
    );

    session.advance(Phase::ThumbnailPrep)?;
    let thumbnail = match pipeline
        .prepare_thumbnail(session, event, output_kind, &plan.work_dir, cancel)
        .await
    {
        Ok(thumbnail) => thumbnail,
        Err(e) if e.is_cancelled() => return Err(e),
        Err(e) => {
            warn!(error = %e, "Thumbnail unavailable, uploading without one");
            session.discard_thumbnail().await;
            None
        }
    };

    session.advance(Phase::Uploading)?;
    let request = UploadRequest {
        chat_id: event.chat_id,
        reply_to: Some(event.message_id),
        path: &plan.path,
        file_name: &plan.file_name,
        thumbnail: thumbnail.as_deref(),
        caption: &caption,
        duration: (duration > 0).then_some(duration),
    };
    {
        let mut progress =
            StatusProgress::new(services.messenger.as_ref(), *status, UPLOADING_TEXT, interval);
        let upload = async {
            match output_kind {
                MediaKind::Document => {
                    services.transport.upload_document(&request, &mut progress).await
                }
                MediaKind::Video => services.transport.upload_video(&request, &mut progress).await,
                MediaKind::Audio => services.transport.upload_audio(&request, &mut progress).await,
            }
        };
        cancellable(cancel, upload).await?;
    }

    session.advance(Phase::Cleanup)?;
    if let Err(e) = services.messenger.delete(status).await {
        debug!(error = %e, "Failed to delete status message");
    }
    session.cleanup().await;
    session.advance(Phase::Done)?;
    Ok(())
}

/// Fail with [`Error::Cancelled`] as soon as `cancel` fires.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

/// Edits the status message with throttled transfer progress.
struct StatusProgress<'a> {
    messenger: &'a dyn Messenger,
    handle: StatusHandle,
    reporter: ProgressReporter,
}

impl<'a> StatusProgress<'a> {
    fn new(
        messenger: &'a dyn Messenger,
        handle: StatusHandle,
        label: &str,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            messenger,
            handle,
            reporter: ProgressReporter::new(label, interval),
        }
    }
}

#[async_trait]
impl ProgressSink for StatusProgress<'_> {
    async fn on_progress(&mut self, current: u64, total: u64) {
        let Some(snapshot) = self.reporter.update(current, total) else {
            return;
        };
        if let Err(e) = self.messenger.edit(&self.handle, &snapshot.render()).await {
            debug!(error = %e, "Failed to edit progress message");
        }
    }
}
