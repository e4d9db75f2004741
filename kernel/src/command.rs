//! Typed idempotent commands over the root supervisor (§4.2, §9).
//!
//! Replaces the spec's "dynamically-typed command args" with a tagged sum: one
//! variant per command, each carrying typed fields, per the §9 redesign note. A
//! thin `serde` `Deserialize` maps wire JSON onto the right variant.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// One mutation request to the supervisor (§4.2 table). `cmd_id` is caller-chosen
/// and used for at-most-once effect under at-least-once delivery (I1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "args", rename_all = "snake_case")]
pub enum Command {
    CreateAgent { agent_id: String, blueprint: Vec<u8> },
    DeleteAgent { agent_id: String },
    StartAgent { agent_id: String, input: serde_json::Value },
    SignalAgent { run_id: String, signal: String, payload: serde_json::Value },
    RegisterTool { tool_def_json: serde_json::Value },
    DeregisterTool { tool_name: String },
    /// Test-only: causes the supervisor to terminate with an identifying error.
    StopWorkflow,
}

/// A command envelope: the typed command plus its idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub command: Command,
    pub cmd_id: String,
}

impl CommandEnvelope {
    /// Parses the wire shape `{cmd, args, cmd_id}` (§4.2) into a typed envelope.
    /// Unknown `cmd` or malformed `args` is a `ValidationError`, never a panic.
    pub fn from_wire(value: &serde_json::Value) -> Result<Self, crate::error::CommandError> {
        let cmd_id = value
            .get("cmd_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| crate::error::CommandError::Validation("missing cmd_id".into()))?
            .to_string();
        let mut tagged = serde_json::Map::new();
        if let Some(cmd) = value.get("cmd") {
            tagged.insert("cmd".to_string(), cmd.clone());
        }
        tagged.insert(
            "args".to_string(),
            value.get("args").cloned().unwrap_or(serde_json::Value::Null),
        );
        let command: Command = serde_json::from_value(serde_json::Value::Object(tagged))
            .map_err(|e| crate::error::CommandError::Validation(e.to_string()))?;
        Ok(Self { command, cmd_id })
    }
}

/// Bounded set of previously-processed `cmd_id`s (§3 `SeenCommands`). Bounded FIFO
/// so a long-lived supervisor's memory doesn't grow without limit; eviction only
/// matters for commands old enough to never be legitimately redelivered.
pub struct SeenCommands {
    capacity: usize,
    order: Mutex<VecDeque<String>>,
    set: Mutex<std::collections::HashSet<String>>,
}

impl SeenCommands {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: Mutex::new(VecDeque::new()),
            set: Mutex::new(std::collections::HashSet::new()),
        }
    }

    /// Returns `true` if `cmd_id` was already seen (duplicate). Otherwise records it
    /// and returns `false`.
    pub fn check_and_record(&self, cmd_id: &str) -> bool {
        let mut set = self.set.lock().unwrap();
        if set.contains(cmd_id) {
            return true;
        }
        set.insert(cmd_id.to_string());
        let mut order = self.order.lock().unwrap();
        order.push_back(cmd_id.to_string());
        if order.len() > self.capacity {
            if let Some(oldest) = order.pop_front() {
                set.remove(&oldest);
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.set.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of currently-tracked ids, in insertion order, for carrying across
    /// `continue_as_new` (§3 "continue-as-new preserves SeenCommands").
    pub fn snapshot(&self) -> Vec<String> {
        self.order.lock().unwrap().iter().cloned().collect()
    }

    /// Rebuilds from a prior snapshot (used when resuming after continue_as_new).
    pub fn from_snapshot(capacity: usize, ids: Vec<String>) -> Self {
        let seen = Self::new(capacity);
        for id in ids {
            seen.check_and_record(&id);
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario** (I1): re-processing a command with a previously-seen cmd_id is
    /// reported as a duplicate.
    #[test]
    fn duplicate_cmd_id_is_detected() {
        let seen = SeenCommands::new(10);
        assert!(!seen.check_and_record("c1"));
        assert!(seen.check_and_record("c1"));
    }

    /// **Scenario**: once capacity is exceeded, the oldest id is evicted.
    #[test]
    fn bounded_capacity_evicts_oldest() {
        let seen = SeenCommands::new(2);
        seen.check_and_record("a");
        seen.check_and_record("b");
        seen.check_and_record("c");
        assert_eq!(seen.len(), 2);
        // "a" was evicted, so it is no longer considered seen.
        assert!(!seen.check_and_record("a"));
    }

    /// **Scenario**: snapshot/from_snapshot round-trips seen ids across continue_as_new.
    #[test]
    fn snapshot_round_trips_across_continue_as_new() {
        let seen = SeenCommands::new(10);
        seen.check_and_record("c1");
        seen.check_and_record("c2");
        let restored = SeenCommands::from_snapshot(10, seen.snapshot());
        assert!(restored.check_and_record("c1"));
        assert!(restored.check_and_record("c2"));
        assert!(!restored.check_and_record("c3"));
    }

    /// **Scenario**: command JSON with `cmd`/`args` tags deserializes into the right variant.
    #[test]
    fn command_deserializes_tagged_json() {
        let json = serde_json::json!({
            "cmd": "start_agent",
            "args": {"agent_id": "A", "input": {"x": 1}},
            "cmd_id": "c3"
        });
        let env = CommandEnvelope::from_wire(&json).unwrap();
        assert_eq!(env.cmd_id, "c3");
        match env.command {
            Command::StartAgent { agent_id, .. } => assert_eq!(agent_id, "A"),
            other => panic!("wrong variant: {:?}", other),
        }
    }

    /// **Scenario**: an unrecognized `cmd` tag is a ValidationError, not a panic.
    #[test]
    fn unknown_cmd_tag_is_validation_error() {
        let json = serde_json::json!({"cmd": "nonexistent", "args": {}, "cmd_id": "c1"});
        let err = CommandEnvelope::from_wire(&json).unwrap_err();
        assert!(matches!(err, crate::error::CommandError::Validation(_)));
    }
}
