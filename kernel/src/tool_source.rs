//! Tool-call wire types shared between the LLM client and the tool registry.
//!
//! Copied in shape from the teacher's `tool_source` module (`ToolSpec`,
//! `ToolCallContent`, `ToolCallContext`, `ToolSourceError` align with MCP's
//! `tools/list`/`tools/call`), trimmed to what the planned-agent step activity needs.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::message::Message;

/// Tool specification as presented to the LLM.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Result content of a single tool call.
#[derive(Debug, Clone)]
pub struct ToolCallContent {
    pub text: String,
    #[allow(dead_code)]
    pub image_urls: Vec<String>,
}

impl ToolCallContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_urls: Vec::new(),
        }
    }
}

/// Per-call context threaded through `Tool::call` (e.g. recent conversation history
/// for tools like `get_recent_messages`). Optional; most tools ignore it.
#[derive(Debug, Clone, Default)]
pub struct ToolCallContext {
    pub recent_messages: Vec<Message>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolSourceError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait ToolSource: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError>;
}
