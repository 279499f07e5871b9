//! Throttled transfer progress.
//!
//! A [`ProgressReporter`] is owned by one transfer. Every chunk callback goes
//! through [`ProgressReporter::update`]; it returns a snapshot only when the
//! status message should actually be edited.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::format::{format_elapsed, human_bytes, human_bytes_f64};

/// Default minimum gap between two emitted updates.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

const BAR_WIDTH: u64 = 10;
const BAR_FILLED: char = '■';
const BAR_EMPTY: char = '□';

/// One emitted progress state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub label: String,
    pub bytes_done: u64,
    pub bytes_total: u64,
    pub percent: f64,
    pub speed_bytes_per_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<f64>,
    pub elapsed_secs: f64,
}

impl ProgressSnapshot {
    /// Status-message text for this snapshot.
    pub fn render(&self) -> String {
        let filled = if self.bytes_total > 0 {
            (BAR_WIDTH * self.bytes_done.min(self.bytes_total)) / self.bytes_total
        } else {
            0
        };
        let bar: String = (0..BAR_WIDTH)
            .map(|i| if i < filled { BAR_FILLED } else { BAR_EMPTY })
            .collect();

        let eta = self
            .eta_secs
            .map(|secs| format_elapsed((secs * 1000.0).round() as u64))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "0 s".to_string());

        let speed = if self.speed_bytes_per_sec > 0.0 {
            human_bytes_f64(self.speed_bytes_per_sec)
        } else {
            "0 B".to_string()
        };

        format!(
            "{label}\n\n[{bar}] {percent:.2}%\nDone: {done} of {total}\nSpeed: {speed}/s\nETA: {eta}",
            label = self.label,
            percent = self.percent,
            done = human_bytes(self.bytes_done),
            total = human_bytes(self.bytes_total),
        )
    }
}

/// Decides when a transfer's progress is worth reporting.
///
/// Emits at most once per `interval`, plus exactly once when the transfer
/// completes.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    label: String,
    interval: Duration,
    started: Instant,
    last_emit: Option<Instant>,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(label: impl Into<String>, interval: Duration) -> Self {
        Self::starting_at(label, interval, Instant::now())
    }

    pub fn starting_at(label: impl Into<String>, interval: Duration, started: Instant) -> Self {
        Self {
            label: label.into(),
            interval,
            started,
            last_emit: None,
            finished: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Feed the latest byte counts; returns a snapshot when one is due.
    pub fn update(&mut self, current: u64, total: u64) -> Option<ProgressSnapshot> {
        self.update_at(current, total, Instant::now())
    }

    pub fn update_at(&mut self, current: u64, total: u64, now: Instant) -> Option<ProgressSnapshot> {
        if self.finished {
            return None;
        }

        let complete = total > 0 && current >= total;
        let since_last = now.saturating_duration_since(self.last_emit.unwrap_or(self.started));
        if !complete && since_last < self.interval {
            return None;
        }

        self.last_emit = Some(now);
        self.finished = complete;
        Some(self.snapshot(current, total, now))
    }

    fn snapshot(&self, current: u64, total: u64, now: Instant) -> ProgressSnapshot {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        let percent = if total > 0 {
            (current.min(total) as f64 * 100.0) / total as f64
        } else {
            0.0
        };
        let speed = if elapsed > 0.0 {
            current as f64 / elapsed
        } else {
            0.0
        };
        let eta_secs = (speed > 0.0 && total >= current).then(|| (total - current) as f64 / speed);

        ProgressSnapshot {
            label: self.label.clone(),
            bytes_done: current,
            bytes_total: total,
            percent,
            speed_bytes_per_sec: speed,
            eta_secs,
            elapsed_secs: elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_throttles_between_intervals() {
        let t0 = Instant::now();
        let mut reporter = ProgressReporter::starting_at("Downloading", Duration::from_secs(5), t0);

        assert!(reporter.update_at(MIB, 10 * MIB, t0 + Duration::from_secs(1)).is_none());
        assert!(reporter.update_at(2 * MIB, 10 * MIB, t0 + Duration::from_secs(5)).is_some());
        assert!(reporter.update_at(3 * MIB, 10 * MIB, t0 + Duration::from_secs(7)).is_none());
        assert!(reporter.update_at(4 * MIB, 10 * MIB, t0 + Duration::from_secs(10)).is_some());
    }

    #[test]
    fn test_completion_always_emits_once() {
        let t0 = Instant::now();
        let mut reporter = ProgressReporter::starting_at("Uploading", Duration::from_secs(5), t0);

        let done = reporter
            .update_at(10 * MIB, 10 * MIB, t0 + Duration::from_millis(200))
            .unwrap();
        assert_eq!(done.percent, 100.0);
        assert!(reporter.update_at(10 * MIB, 10 * MIB, t0 + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn test_unknown_total_never_completes() {
        let t0 = Instant::now();
        let mut reporter = ProgressReporter::starting_at("Downloading", Duration::from_secs(5), t0);
        assert!(reporter.update_at(MIB, 0, t0 + Duration::from_secs(1)).is_none());
        let snap = reporter.update_at(MIB, 0, t0 + Duration::from_secs(6)).unwrap();
        assert_eq!(snap.percent, 0.0);
        assert_eq!(snap.eta_secs, None);
    }

    #[test]
    fn test_snapshot_figures() {
        let t0 = Instant::now();
        let mut reporter = ProgressReporter::starting_at("Downloading", Duration::from_secs(5), t0);
        let snap = reporter
            .update_at(5 * MIB, 10 * MIB, t0 + Duration::from_secs(5))
            .unwrap();

        assert_eq!(snap.percent, 50.0);
        assert_eq!(snap.speed_bytes_per_sec, MIB as f64);
        assert_eq!(snap.eta_secs, Some(5.0));
    }

    #[test]
    fn test_render() {
        let snap = ProgressSnapshot {
            label: "Downloading".to_string(),
            bytes_done: 5 * MIB,
            bytes_total: 10 * MIB,
            percent: 50.0,
            speed_bytes_per_sec: MIB as f64,
            eta_secs: Some(5.0),
            elapsed_secs: 5.0,
        };
        let text = snap.render();
        assert!(text.starts_with("Downloading\n\n[■■■■■□□□□□] 50.00%"));
        assert!(text.contains("Done: 5 MB of 10 MB"));
        assert!(text.contains("Speed: 1024 KB/s"));
        assert!(text.contains("ETA: 5s"));
    }
}
