//! Data model entities owned exclusively by the root supervisor (§3): blueprints,
//! registry entries, and run records.

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// `{max_steps, max_tokens_total}` ceilings for a planned-agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub max_steps: u32,
    pub max_tokens_total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub nodes: Vec<String>,
    pub revision: u32,
}

/// An immutable agent specification, parsed from an opaque byte blob at
/// registration time (§3). `version` is a dotted `major.minor.patch` string;
/// monotonicity across re-registration is a DESIGN.md-recorded policy choice (§9
/// Open Question), not enforced by this type itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub agent_id: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub budget: Budget,
    pub llm: LlmConfig,
    pub graph: GraphConfig,
    #[serde(default)]
    pub on_finish: Option<String>,
}

impl Blueprint {
    /// Parses and validates a blueprint from its wire bytes. Malformed JSON or a
    /// missing required field is a `ValidationError` (§7), never a panic.
    pub fn parse(bytes: &[u8]) -> Result<Self, CommandError> {
        serde_json::from_slice(bytes).map_err(|e| CommandError::Validation(e.to_string()))
    }
}

/// Parses a dotted version string into `(major, minor, patch)` for comparison.
/// Non-numeric or short components sort as `0`, so malformed versions degrade to
/// "never newer" rather than erroring — version checks are advisory, not load-bearing.
pub fn parse_version(v: &str) -> (u64, u64, u64) {
    let mut parts = v.split('.').map(|p| p.parse::<u64>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

pub fn version_is_monotonic(prev: &str, next: &str) -> bool {
    parse_version(next) >= parse_version(prev)
}

/// Registry entry (§3 `AgentInfo`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub agent_id: String,
    pub version: String,
    pub blueprint_bytes: Vec<u8>,
    pub created_at: i64,
}

/// Terminal states are sticky: once set, a `Run`'s status never changes again (§3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// An execution instance of a blueprint (§3 `Run`), 1:1 with a child workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub agent_id: String,
    pub started_at: i64,
    pub status: RunStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blueprint_json(agent_id: &str, version: &str) -> Vec<u8> {
        serde_json::json!({
            "agent_id": agent_id,
            "version": version,
            "description": "test agent",
            "budget": {"max_steps": 10, "max_tokens_total": 100000},
            "llm": {"model": "gpt-4o"},
            "graph": {"nodes": ["start"], "revision": 1}
        })
        .to_string()
        .into_bytes()
    }

    /// **Scenario**: a well-formed blueprint parses with all fields intact.
    #[test]
    fn parse_valid_blueprint() {
        let bytes = blueprint_json("A", "1.0.0");
        let bp = Blueprint::parse(&bytes).unwrap();
        assert_eq!(bp.agent_id, "A");
        assert_eq!(bp.version, "1.0.0");
        assert_eq!(bp.budget.max_steps, 10);
    }

    /// **Scenario**: malformed JSON is a ValidationError, not a panic.
    #[test]
    fn parse_malformed_blueprint_is_validation_error() {
        let err = Blueprint::parse(b"{ not json").unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
    }

    /// **Scenario**: version_is_monotonic accepts equal/greater, rejects a downgrade.
    #[test]
    fn version_monotonicity_checks() {
        assert!(version_is_monotonic("1.0.0", "1.0.1"));
        assert!(version_is_monotonic("1.0.0", "1.0.0"));
        assert!(!version_is_monotonic("1.2.0", "1.1.9"));
    }

    /// **Scenario**: only RUNNING is non-terminal.
    #[test]
    fn only_running_is_non_terminal() {
        assert!(!RunStatus::Running.is_terminal());
        for s in [
            RunStatus::Completed,
            RunStatus::Failed,
            RunStatus::Cancelled,
            RunStatus::Timeout,
        ] {
            assert!(s.is_terminal());
        }
    }
}
