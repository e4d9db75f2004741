//! History-size tracking and the `continue_as_new` compaction threshold (§4.1).
//!
//! A workflow tracks the approximate serialized size of the events it has recorded
//! (signals consumed, activity results, timer fires). When it crosses the
//! threshold, the workflow drains pending signals into state and calls
//! `continue_as_new`, restarting with a fresh event log and the carried state.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default history-size threshold before a workflow must self-compact (§4.1).
pub const DEFAULT_HISTORY_THRESHOLD_BYTES: usize = 1024 * 1024;

/// Tracks recorded-event bytes for one workflow execution.
pub struct HistoryTracker {
    size_bytes: AtomicUsize,
    threshold: usize,
}

impl HistoryTracker {
    pub fn new(threshold: usize) -> Self {
        Self {
            size_bytes: AtomicUsize::new(0),
            threshold,
        }
    }

    pub fn with_default_threshold() -> Self {
        Self::new(DEFAULT_HISTORY_THRESHOLD_BYTES)
    }

    /// Records that an event of `bytes` size was appended to history.
    pub fn record(&self, bytes: usize) {
        self.size_bytes.fetch_add(bytes, Ordering::SeqCst);
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes.load(Ordering::SeqCst)
    }

    /// `true` once `size_bytes` exceeds the threshold; caller must then drain
    /// pending signals and call `continue_as_new` before more work is dispatched.
    pub fn should_compact(&self) -> bool {
        self.size_bytes() > self.threshold
    }

    /// Resets the tracked size after a successful `continue_as_new`.
    pub fn reset(&self) {
        self.size_bytes.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: should_compact flips to true once recorded bytes exceed the threshold.
    #[test]
    fn should_compact_past_threshold() {
        let tracker = HistoryTracker::new(100);
        tracker.record(50);
        assert!(!tracker.should_compact());
        tracker.record(51);
        assert!(tracker.should_compact());
    }

    /// **Scenario**: reset clears the tracked size after continue_as_new.
    #[test]
    fn reset_clears_size() {
        let tracker = HistoryTracker::new(10);
        tracker.record(20);
        assert!(tracker.should_compact());
        tracker.reset();
        assert!(!tracker.should_compact());
        assert_eq!(tracker.size_bytes(), 0);
    }
}
