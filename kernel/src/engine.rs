//! Process-level run registry: spawns child workflow executions as tokio tasks and
//! tracks their handles for cancellation (§5 "Cancellation: parent cancellation
//! propagates to children").
//!
//! Single-node only (§1 Non-goals: no cluster-mode sharding) — `WorkflowEngine` is a
//! thin wrapper around `tokio::spawn` plus a [`SignalRouter`], not a distributed
//! scheduler.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::signal::SignalRouter;

/// Shared runtime services every workflow execution needs: where to route signals,
/// and a place to register its own task handle for cancellation.
pub struct WorkflowEngine {
    pub signals: Arc<SignalRouter>,
    tasks: DashMap<String, JoinHandle<()>>,
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self {
            signals: Arc::new(SignalRouter::new()),
            tasks: DashMap::new(),
        }
    }

    /// Spawns `fut` as the child workflow identified by `run_id`, replacing any
    /// previous task registered under the same id (a prior terminal run being reaped).
    pub fn spawn_child<F>(&self, run_id: impl Into<String>, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let run_id = run_id.into();
        let handle = tokio::spawn(fut);
        self.tasks.insert(run_id, handle);
    }

    /// Forwards `(signal, payload)` to the child workflow's named channel (§4.2 `signal_agent`).
    pub fn signal(&self, run_id: &str, name: &str, payload: serde_json::Value) {
        self.signals.send(run_id, name, payload);
    }

    /// Aborts the child task in flight, per cancellation propagation (§5). The task's
    /// own cleanup (appending `ERROR{cancelled}`, reporting CANCELLED) races the
    /// abort, so callers relying on the terminal status should prefer cooperative
    /// cancellation signals where the workflow supports them.
    pub fn cancel(&self, run_id: &str) -> bool {
        if let Some((_, handle)) = self.tasks.remove(run_id) {
            handle.abort();
            true
        } else {
            false
        }
    }

    pub fn is_running(&self, run_id: &str) -> bool {
        self.tasks
            .get(run_id)
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Removes finished task handles, keeping the map from growing unbounded over
    /// a long-lived supervisor's lifetime.
    pub fn reap_finished(&self) {
        self.tasks.retain(|_, handle| !handle.is_finished());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// **Scenario**: a spawned child eventually finishes and is_running reports false.
    #[tokio::test]
    async fn spawned_child_completes() {
        let engine = WorkflowEngine::new();
        let done = Arc::new(AtomicBool::new(false));
        let done2 = done.clone();
        engine.spawn_child("r1", async move {
            done2.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(done.load(Ordering::SeqCst));
        assert!(!engine.is_running("r1"));
    }

    /// **Scenario**: cancel aborts a long-running child and returns true once.
    #[tokio::test]
    async fn cancel_aborts_running_child() {
        let engine = WorkflowEngine::new();
        engine.spawn_child("r2", async move {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        assert!(engine.is_running("r2"));
        assert!(engine.cancel("r2"));
        assert!(!engine.cancel("r2"));
    }

    /// **Scenario**: signal routed through the engine is visible on the shared router.
    #[test]
    fn signal_routes_through_shared_router() {
        let engine = WorkflowEngine::new();
        engine.signal("r3", "poke", serde_json::json!({"n": 1}));
        assert_eq!(
            engine.signals.channel("r3", "poke").drain(),
            vec![serde_json::json!({"n": 1})]
        );
    }
}
