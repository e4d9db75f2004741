//! Workflow execution context: the deterministic side of the substrate (§4.1, §9).
//!
//! Workflow code itself is modelled as a plain async function running as a tokio
//! task (the "coroutine control flow" redesign note of §9: native async satisfies
//! the suspend-only-at-substrate-points rule as long as the only `.await` points are
//! the ones [`WorkflowContext`] exposes — signal receive, timer, activity call,
//! child-workflow call). `now()` and RNG are never read directly by workflow code;
//! they are obtained through activities (§4.4 determinism rule), so
//! [`WorkflowContext::now`] exists only for logging/diagnostics, never for branching.

use std::sync::Arc;
use std::time::Duration;

use crate::history::HistoryTracker;
use crate::signal::SignalRouter;

/// Per-execution context threaded through one workflow's run loop.
pub struct WorkflowContext {
    pub workflow_id: String,
    signals: Arc<SignalRouter>,
    history: Arc<HistoryTracker>,
}

impl WorkflowContext {
    pub fn new(workflow_id: impl Into<String>, signals: Arc<SignalRouter>, history: Arc<HistoryTracker>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            signals,
            history,
        }
    }

    /// Suspends until the next signal named `name` arrives for this workflow.
    pub async fn recv_signal(&self, name: &str) -> serde_json::Value {
        self.signals.channel(&self.workflow_id, name).recv().await
    }

    /// Drains every immediately-pending signal named `name` without suspending.
    pub fn drain_signal(&self, name: &str) -> Vec<serde_json::Value> {
        self.signals.channel(&self.workflow_id, name).drain()
    }

    /// Drains every immediately-pending signal for this workflow, any name (§4.4
    /// step 3: signal names are chosen by the blueprint, not known in advance).
    pub fn drain_all_signals(&self) -> Vec<(String, serde_json::Value)> {
        self.signals.drain_all(&self.workflow_id)
    }

    /// A durable timer: suspends the workflow for `duration`. The duration itself
    /// must be computed from activity results or fixed config, never live RNG.
    pub async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Wall-clock time for logging only; never branch workflow logic on this.
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }

    /// Records an event's serialized size against the history tracker.
    pub fn record_history_event(&self, bytes: usize) {
        self.history.record(bytes);
    }

    pub fn should_continue_as_new(&self) -> bool {
        self.history.should_compact()
    }

    /// Marks that `continue_as_new` has fired: resets the history tracker. Call
    /// after draining pending signals into the carried-over state.
    pub fn mark_continued_as_new(&self) {
        self.history.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: a signal sent before recv_signal is awaited is still delivered.
    #[tokio::test]
    async fn recv_signal_delivers_previously_sent_payload() {
        let signals = Arc::new(SignalRouter::new());
        let history = Arc::new(HistoryTracker::with_default_threshold());
        let ctx = WorkflowContext::new("wf1", signals.clone(), history);
        signals.send("wf1", "poke", serde_json::json!({"n": 2}));
        let payload = ctx.recv_signal("poke").await;
        assert_eq!(payload, serde_json::json!({"n": 2}));
    }

    /// **Scenario**: mark_continued_as_new resets should_continue_as_new to false.
    #[test]
    fn mark_continued_as_new_resets_compaction_flag() {
        let signals = Arc::new(SignalRouter::new());
        let history = Arc::new(HistoryTracker::new(10));
        let ctx = WorkflowContext::new("wf1", signals, history);
        ctx.record_history_event(20);
        assert!(ctx.should_continue_as_new());
        ctx.mark_continued_as_new();
        assert!(!ctx.should_continue_as_new());
    }
}
