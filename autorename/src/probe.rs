//! Duration probing through `ffprobe`.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::services::MediaProbe;
use crate::{Error, Result};

/// Runs `ffprobe` against the downloaded file and reads the container
/// duration.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_path: String,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    async fn run(&self, path: &Path) -> Result<u64> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Probe(format!("Failed to spawn ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Probe(format!(
                "ffprobe failed with exit code: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        parse_duration(&output.stdout)
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe_duration(&self, path: &Path) -> Option<u64> {
        match self.run(path).await {
            Ok(secs) => {
                debug!(path = %path.display(), duration = secs, "Probed media duration");
                Some(secs)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not probe media duration");
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Whole seconds from ffprobe's `-show_format` JSON.
fn parse_duration(stdout: &[u8]) -> Result<u64> {
    let output: ProbeOutput = serde_json::from_slice(stdout)?;
    let raw = output
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| Error::Probe("ffprobe reported no duration".to_string()))?;

    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::Probe(format!("Invalid duration: {raw}")))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::Probe(format!("Invalid duration: {raw}")));
    }
    Ok(secs as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let json = br#"{"format": {"filename": "a.mkv", "duration": "1425.360000", "size": "1"}}"#;
        assert_eq!(parse_duration(json).unwrap(), 1425);
    }

    #[test]
    fn test_parse_duration_missing() {
        assert!(parse_duration(br#"{"format": {"filename": "a.txt"}}"#).is_err());
        assert!(parse_duration(br#"{}"#).is_err());
        assert!(parse_duration(b"not json").is_err());
        assert!(parse_duration(br#"{"format": {"duration": "N/A"}}"#).is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_yields_none() {
        let probe = FfprobeProbe::new("/nonexistent/ffprobe-binary");
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(probe.probe_duration(&dir.path().join("x.mkv")).await, None);
    }
}
