//! LLM completion: the external collaborator the agent-step activity calls.
//!
//! Contract per spec §6: `complete(messages, tools?, model) -> {content, tool_calls?}`.
//! Shaped after the teacher's `LlmClient`/`LlmResponse`/`LlmUsage` trio, trimmed to
//! the stateless single-call contract the planned-agent activity actually needs
//! (no streaming, no `ToolChoiceMode` — the activity always lets the model choose).

mod mock;

pub use mock::MockLlm;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::message::Message;
use crate::tool_source::ToolSpec;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Token accounting for one completion call.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Result of one LLM completion.
///
/// `done` is the model's own completion decision for the step that produced this
/// response (§4.4 step 2b: the agent-step activity "returns `{observation,
/// tool_calls[], done}`", `done` coming from the model, not the workflow counting
/// steps). A response that omits it defaults to `false` — the workflow's own
/// last-step fallback still terminates the plan either way.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LlmResponse {
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub usage: LlmUsage,
    #[serde(default)]
    pub done: bool,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            usage: LlmUsage::default(),
            done: false,
        }
    }

    /// Same as `text`, but signals the model considers the plan finished.
    pub fn finished(content: impl Into<String>) -> Self {
        Self { done: true, ..Self::text(content) }
    }
}

#[derive(Debug, Error, Clone)]
pub enum LlmError {
    #[error("upstream LLM error: {0}")]
    Upstream(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
}

/// One completion call: an ordered transcript plus an optional tool catalog.
///
/// Implementations are invoked only from activities (§4.1: activities are the sole
/// source of non-determinism); workflow code never calls this directly.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSpec]>,
        model: &str,
    ) -> Result<LlmResponse, LlmError>;
}
