//! Duplicate suppression for inbound files.
//!
//! The gate remembers when each file identity was last seen and refuses a
//! second session for the same identity inside the suppression window. It is
//! an in-memory, best-effort filter: nothing survives a restart.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

/// Default suppression window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Default entry count above which stale entries are pruned.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Concurrent identity -> last-seen map with a fixed window.
///
/// Check-and-stamp for one identity runs under that key's shard lock, so two
/// racing events for the same file can never both be admitted.
#[derive(Debug)]
pub struct DebounceGate {
    entries: DashMap<String, Instant>,
    window: Duration,
    max_entries: usize,
}

impl DebounceGate {
    pub fn new(window: Duration) -> Self {
        Self::with_capacity(window, DEFAULT_MAX_ENTRIES)
    }

    /// Gate that prunes expired entries once it holds more than `max_entries`.
    pub fn with_capacity(window: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            window,
            max_entries: max_entries.max(1),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit `identity` now. Returns `false` if it was seen within the window.
    pub fn admit(&self, identity: &str) -> bool {
        self.admit_at(identity, Instant::now())
    }

    /// Admit `identity` as of `now`.
    pub fn admit_at(&self, identity: &str, now: Instant) -> bool {
        self.prune_if_needed(now);

        match self.entries.entry(identity.to_string()) {
            Entry::Occupied(mut entry) => {
                let since = now.saturating_duration_since(*entry.get());
                if since < self.window {
                    debug!(identity, ?since, "Suppressing duplicate file event");
                    return false;
                }
                entry.insert(now);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Record `identity` as seen now without an admission check.
    ///
    /// Called when a session ends, successfully or not, so an immediate resend
    /// is throttled like a duplicate.
    pub fn stamp(&self, identity: &str) {
        self.stamp_at(identity, Instant::now());
    }

    pub fn stamp_at(&self, identity: &str, now: Instant) {
        self.entries.insert(identity.to_string(), now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose window has passed, once the map outgrows its bound.
    ///
    /// Entries still inside their window are kept even above the bound, since
    /// evicting them would let duplicates through.
    fn prune_if_needed(&self, now: Instant) {
        if self.entries.len() < self.max_entries {
            return;
        }
        let before = self.entries.len();
        self.entries
            .retain(|_, seen| now.saturating_duration_since(*seen) < self.window);
        debug!(
            before,
            after = self.entries.len(),
            "Pruned expired debounce entries"
        );
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    #[test]
    fn test_second_admission_within_window_is_dropped() {
        let gate = DebounceGate::new(Duration::from_secs(10));
        let t0 = Instant::now();

        assert!(gate.admit_at("file-1", t0));
        assert!(!gate.admit_at("file-1", t0 + Duration::from_secs(3)));
        assert!(gate.admit_at("file-1", t0 + Duration::from_secs(10)));
    }

    #[test]
    fn test_rejected_admission_does_not_extend_window() {
        let gate = DebounceGate::new(Duration::from_secs(10));
        let t0 = Instant::now();

        assert!(gate.admit_at("f", t0));
        assert!(!gate.admit_at("f", t0 + Duration::from_secs(9)));
        assert!(gate.admit_at("f", t0 + Duration::from_secs(11)));
    }

    #[test]
    fn test_distinct_identities_are_independent() {
        let gate = DebounceGate::default();
        let t0 = Instant::now();
        assert!(gate.admit_at("a", t0));
        assert!(gate.admit_at("b", t0));
        assert_eq!(gate.len(), 2);
    }

    #[test]
    fn test_stamp_restarts_window() {
        let gate = DebounceGate::new(Duration::from_secs(10));
        let t0 = Instant::now();

        assert!(gate.admit_at("f", t0));
        gate.stamp_at("f", t0 + Duration::from_secs(60));
        assert!(!gate.admit_at("f", t0 + Duration::from_secs(65)));
        assert!(gate.admit_at("f", t0 + Duration::from_secs(70)));
    }

    #[test]
    fn test_concurrent_same_identity_admitted_once() {
        let gate = Arc::new(DebounceGate::default());
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let gate = gate.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    gate.admit("same-file")
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
    }

    #[test]
    fn test_prunes_expired_entries_past_bound() {
        let gate = DebounceGate::with_capacity(Duration::from_secs(10), 3);
        let t0 = Instant::now();
        for id in ["a", "b", "c"] {
            assert!(gate.admit_at(id, t0));
        }
        assert_eq!(gate.len(), 3);

        assert!(gate.admit_at("d", t0 + Duration::from_secs(20)));
        assert_eq!(gate.len(), 1);
    }

    #[test]
    fn test_keeps_live_entries_past_bound() {
        let gate = DebounceGate::with_capacity(Duration::from_secs(10), 2);
        let t0 = Instant::now();
        assert!(gate.admit_at("a", t0));
        assert!(gate.admit_at("b", t0));
        assert!(gate.admit_at("c", t0 + Duration::from_secs(1)));
        assert_eq!(gate.len(), 3);
        assert!(!gate.admit_at("a", t0 + Duration::from_secs(2)));
    }
}
