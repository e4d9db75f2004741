//! `image-generate`: the tool the friend scheduler's `memory_picture` branch calls
//! (§4.5). One file, one `Tool` impl, following the teacher's
//! `tools/memory/search_memories.rs`-style single-purpose tool.

use async_trait::async_trait;

use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
use crate::tools::Tool;

/// Generates an image from a text prompt and returns its URL.
///
/// The concrete image-generation backend is a named collaborator out of scope
/// (§1); implementations plug in behind this trait's single method.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ToolSourceError>;
}

/// Deterministic generator for tests: returns a URL derived from the prompt.
pub struct StubImageGenerator;

#[async_trait]
impl ImageGenerator for StubImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ToolSourceError> {
        let slug: String = prompt
            .chars()
            .filter(|c| c.is_alphanumeric())
            .take(32)
            .collect();
        Ok(format!("https://images.invalid/{}.png", slug.to_lowercase()))
    }
}

pub struct ImageGenerateTool {
    generator: std::sync::Arc<dyn ImageGenerator>,
}

impl ImageGenerateTool {
    pub fn new(generator: std::sync::Arc<dyn ImageGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Tool for ImageGenerateTool {
    fn name(&self) -> &str {
        "image-generate"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "image-generate".into(),
            description: Some("Generates an image from a text prompt, returns its URL".into()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "prompt": { "type": "string" } },
                "required": ["prompt"]
            }),
        }
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let prompt = args
            .get("prompt")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing 'prompt'".into()))?;
        let url = self.generator.generate(prompt).await?;
        Ok(ToolCallContent {
            text: url.clone(),
            image_urls: vec![url],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: calling with a prompt returns an image URL in both text and image_urls.
    #[tokio::test]
    async fn generate_returns_url() {
        let tool = ImageGenerateTool::new(std::sync::Arc::new(StubImageGenerator));
        let result = tool
            .call(serde_json::json!({"prompt": "a red bicycle"}), None)
            .await
            .unwrap();
        assert!(result.text.starts_with("https://"));
        assert_eq!(result.image_urls.len(), 1);
    }

    /// **Scenario**: missing prompt argument is an InvalidInput error.
    #[tokio::test]
    async fn missing_prompt_is_invalid_input() {
        let tool = ImageGenerateTool::new(std::sync::Arc::new(StubImageGenerator));
        let err = tool.call(serde_json::json!({}), None).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
    }
}
