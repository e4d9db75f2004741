//! `question-pool`: backs the friend scheduler's `question` branch (§4.5 step 4c)
//! — "fetch a random question from a local pool". The random pick itself happens in
//! an activity (`friend::pick_question_activity`), not here; this tool only holds
//! the default pool and exposes it as a catalog entry so it can also be called
//! directly by a planned agent.

use async_trait::async_trait;

use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
use crate::tools::Tool;

pub const DEFAULT_QUESTIONS: &[&str] = &[
    "What made you smile today?",
    "What are you working on right now?",
    "Anything on your mind you want to talk through?",
    "What's something you learned recently?",
    "How's your week going so far?",
];

pub struct QuestionPoolTool {
    questions: Vec<String>,
}

impl QuestionPoolTool {
    pub fn new(questions: Vec<String>) -> Self {
        Self { questions }
    }

    pub fn default_pool() -> Self {
        Self::new(DEFAULT_QUESTIONS.iter().map(|s| s.to_string()).collect())
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }
}

#[async_trait]
impl Tool for QuestionPoolTool {
    fn name(&self) -> &str {
        "question-pool"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "question-pool".into(),
            description: Some("Returns the full list of candidate check-in questions".into()),
            input_schema: serde_json::json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(
        &self,
        _args: serde_json::Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        Ok(ToolCallContent::text(serde_json::to_string(&self.questions).unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: default_pool is non-empty and matches DEFAULT_QUESTIONS.
    #[test]
    fn default_pool_matches_constant() {
        let pool = QuestionPoolTool::default_pool();
        assert_eq!(pool.questions().len(), DEFAULT_QUESTIONS.len());
    }
}
