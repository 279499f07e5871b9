//! Per-file session state.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::utils::fs;
use crate::{Error, Result};

/// Stages of one transfer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[default]
    Idle,
    Admitted,
    Downloading,
    Probing,
    ThumbnailPrep,
    Uploading,
    Cleanup,
    Done,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Admitted => "ADMITTED",
            Self::Downloading => "DOWNLOADING",
            Self::Probing => "PROBING",
            Self::ThumbnailPrep => "THUMBNAIL_PREP",
            Self::Uploading => "UPLOADING",
            Self::Cleanup => "CLEANUP",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }

    /// `Done` and `Failed` end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// The single forward step from this phase.
    fn next(&self) -> Option<Phase> {
        use Phase::*;

        match self {
            Idle => Some(Admitted),
            Admitted => Some(Downloading),
            Downloading => Some(Probing),
            Probing => Some(ThumbnailPrep),
            ThumbnailPrep => Some(Uploading),
            Uploading => Some(Cleanup),
            Cleanup => Some(Done),
            Done | Failed => None,
        }
    }

    /// Validate a transition.
    ///
    /// Sessions only move one step forward; any non-terminal phase may fail.
    pub fn can_transition_to(&self, target: Phase) -> bool {
        match target {
            Phase::Failed => !self.is_terminal(),
            _ => self.next() == Some(target),
        }
    }

    /// Attempt to transition to a new phase.
    pub fn transition_to(&self, target: Phase) -> Result<Phase> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(Error::InvalidPhaseTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state owned by the task processing one file.
///
/// Every local artifact is registered here before it is created, so
/// [`TransferSession::cleanup`] (or `Drop`, if the task is torn down) can
/// remove it whatever stage the session reached.
#[derive(Debug)]
pub struct TransferSession {
    identity: String,
    phase: Phase,
    work_dir: Option<PathBuf>,
    local_path: Option<PathBuf>,
    thumbnail_path: Option<PathBuf>,
    duration: u64,
}

impl TransferSession {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            phase: Phase::Idle,
            work_dir: None,
            local_path: None,
            thumbnail_path: None,
            duration: 0,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    pub fn thumbnail_path(&self) -> Option<&Path> {
        self.thumbnail_path.as_deref()
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn set_duration(&mut self, secs: u64) {
        self.duration = secs;
    }

    pub fn advance(&mut self, target: Phase) -> Result<()> {
        self.phase = self.phase.transition_to(target)?;
        debug!(identity = %self.identity, phase = %self.phase, "Session phase changed");
        Ok(())
    }

    /// Mark the session failed. A no-op once the session is terminal.
    pub fn fail(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = Phase::Failed;
        }
    }

    /// Register the session's private working directory.
    pub fn track_work_dir(&mut self, dir: PathBuf) {
        self.work_dir = Some(dir);
    }

    /// Register the download target.
    pub fn track_download(&mut self, path: PathBuf) {
        self.local_path = Some(path);
    }

    /// Register the thumbnail file.
    pub fn track_thumbnail(&mut self, path: PathBuf) {
        self.thumbnail_path = Some(path);
    }

    /// Remove the thumbnail file, if any, and forget it.
    pub async fn discard_thumbnail(&mut self) {
        if let Some(path) = self.thumbnail_path.take() {
            remove_logged(&path).await;
        }
    }

    /// Remove every artifact this session created. Safe to call repeatedly.
    pub async fn cleanup(&mut self) {
        if let Some(path) = self.local_path.take() {
            remove_logged(&path).await;
        }
        self.discard_thumbnail().await;
        if let Some(dir) = self.work_dir.take() {
            match tokio::fs::remove_dir(&dir).await {
                Ok(()) => debug!(path = %dir.display(), "Removed session directory"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %dir.display(), error = %e, "Failed to remove session directory"),
            }
        }
    }
}

async fn remove_logged(path: &Path) {
    if let Err(e) = fs::remove_file_if_exists(path).await {
        warn!(error = %e, "Failed to remove session artifact");
    }
}

impl Drop for TransferSession {
    fn drop(&mut self) {
        for path in [self.local_path.take(), self.thumbnail_path.take()]
            .into_iter()
            .flatten()
        {
            fs::remove_file_quietly(&path);
        }
        if let Some(dir) = self.work_dir.take() {
            let _ = std::fs::remove_dir(&dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_transitions() {
        let order = [
            Phase::Idle,
            Phase::Admitted,
            Phase::Downloading,
            Phase::Probing,
            Phase::ThumbnailPrep,
            Phase::Uploading,
            Phase::Cleanup,
            Phase::Done,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!Phase::Admitted.can_transition_to(Phase::Uploading));
        assert!(!Phase::Probing.can_transition_to(Phase::Downloading));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_only() {
        assert!(Phase::Downloading.can_transition_to(Phase::Failed));
        assert!(Phase::Uploading.can_transition_to(Phase::Failed));
        assert!(!Phase::Done.can_transition_to(Phase::Failed));
        assert!(!Phase::Failed.can_transition_to(Phase::Cleanup));
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = Phase::Idle.transition_to(Phase::Done).unwrap_err();
        assert!(matches!(err, Error::InvalidPhaseTransition { .. }));
        assert!(err.to_string().contains("IDLE"));
    }

    #[tokio::test]
    async fn test_cleanup_removes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("session");
        tokio::fs::create_dir(&work).await.unwrap();
        let file = work.join("a.mkv");
        let thumb = work.join("thumb.jpg");
        tokio::fs::write(&file, b"x").await.unwrap();
        tokio::fs::write(&thumb, b"y").await.unwrap();

        let mut session = TransferSession::new("id");
        session.track_work_dir(work.clone());
        session.track_download(file.clone());
        session.track_thumbnail(thumb.clone());
        session.cleanup().await;
        session.cleanup().await;

        assert!(!file.exists());
        assert!(!thumb.exists());
        assert!(!work.exists());
    }

    #[test]
    fn test_drop_removes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("partial.bin");
        std::fs::write(&file, b"x").unwrap();

        let mut session = TransferSession::new("id");
        session.track_download(file.clone());
        drop(session);

        assert!(!file.exists());
    }
}
