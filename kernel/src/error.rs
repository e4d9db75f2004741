//! Error taxonomy for the durable-workflow substrate and the commands/tools built on it.
//!
//! Mirrors the teacher's per-module `thiserror` style (`cache/error.rs`,
//! `graphweave/src/error.rs`): one small enum per concern, `Display` messages a human
//! can act on, no blanket `anyhow`.

use thiserror::Error;

/// Classification of an activity failure. The substrate's sole carrier of
/// non-determinism is the activity; everything it can fail with collapses to one
/// of these four kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Network blip, rate limit, anything the retry policy should paper over.
    Transient,
    /// Will never succeed on retry (bad input, programming error).
    Permanent,
    /// The workflow or its activity was cancelled mid-flight.
    Cancelled,
    /// `start_to_close_timeout` (or workflow execution timeout) elapsed.
    Timeout,
}

/// An activity failure, typed by [`ErrorKind`] per spec §7.
#[derive(Debug, Error, Clone)]
#[error("activity failed ({kind:?}): {message}")]
pub struct ActivityError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ActivityError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Transient)
    }
}

/// Command-handling failures (§7). None of these ever fail the supervisor: they are
/// reported back to the caller and the command is still marked seen.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
}

/// Terminal workflow failure cause, carried in `Run::status == FAILED`.
#[derive(Debug, Error, Clone)]
#[error("workflow failed: {0}")]
pub struct WorkflowError(pub String);

/// Tool-call failures (§9 "exception-as-control-flow" redesign note: replaced with
/// an explicit `Result<ToolResult, ToolError>` carrying a `kind`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
}
