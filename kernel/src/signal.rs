//! Signal delivery: an ordered channel per `(workflow_id, name)` (§4.1, §5).
//!
//! Signals are consumed in arrival order within one workflow execution and never
//! interrupt an in-flight activity (§4.4 step 3) — they queue until the workflow
//! next awaits them.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;
use tokio::sync::Notify;

/// An ordered, unbounded queue for one `(workflow_id, name)` pair.
pub struct SignalChannel {
    queue: Mutex<VecDeque<serde_json::Value>>,
    notify: Notify,
}

impl Default for SignalChannel {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }
}

impl SignalChannel {
    fn push(&self, payload: serde_json::Value) {
        self.queue.lock().unwrap().push_back(payload);
        self.notify.notify_one();
    }

    /// Awaits and removes the next pending signal, in arrival order.
    pub async fn recv(&self) -> serde_json::Value {
        loop {
            if let Some(payload) = self.queue.lock().unwrap().pop_front() {
                return payload;
            }
            self.notify.notified().await;
        }
    }

    /// Removes and returns every immediately-available signal without waiting.
    /// Used before `continue_as_new` to drain the drain window (§4.1).
    pub fn drain(&self) -> Vec<serde_json::Value> {
        self.queue.lock().unwrap().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

/// Routes signals to the right `(workflow_id, name)` channel, creating channels
/// lazily on first use so senders never race channel creation with receivers.
#[derive(Default)]
pub struct SignalRouter {
    channels: DashMap<(String, String), std::sync::Arc<SignalChannel>>,
}

impl SignalRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, workflow_id: &str, name: &str) -> std::sync::Arc<SignalChannel> {
        self.channels
            .entry((workflow_id.to_string(), name.to_string()))
            .or_insert_with(|| std::sync::Arc::new(SignalChannel::default()))
            .clone()
    }

    pub fn send(&self, workflow_id: &str, name: &str, payload: serde_json::Value) {
        self.channel(workflow_id, name).push(payload);
    }

    /// Drains every immediately-pending signal for `workflow_id`, across all signal
    /// names — used at a planned-agent step boundary (§4.4 step 3), since the set of
    /// signal names a blueprint listens for is not known to the router in advance.
    pub fn drain_all(&self, workflow_id: &str) -> Vec<(String, serde_json::Value)> {
        self.channels
            .iter()
            .filter(|e| e.key().0 == workflow_id)
            .flat_map(|e| {
                let name = e.key().1.clone();
                e.value().drain().into_iter().map(move |p| (name.clone(), p))
            })
            .collect()
    }
}
