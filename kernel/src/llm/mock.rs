//! Deterministic `LlmClient` for tests, mirroring the teacher's documented
//! mock-for-tests pattern (see `tool_source::MockToolSource`).

use async_trait::async_trait;
use std::sync::Mutex;

use super::{LlmClient, LlmError, LlmResponse};
use crate::message::Message;
use crate::tool_source::ToolSpec;

/// Returns a fixed sequence of responses, one per call, cycling if exhausted.
/// With no scripted responses, echoes the last user message prefixed with "ok: ".
pub struct MockLlm {
    responses: Mutex<Vec<LlmResponse>>,
    calls: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fixed(content: impl Into<String>) -> Self {
        Self::new(vec![LlmResponse::text(content)])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: Option<&[ToolSpec]>,
        model: &str,
    ) -> Result<LlmResponse, LlmError> {
        self.calls.lock().unwrap().push(model.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            let last_user = messages
                .iter()
                .rev()
                .find(|m| matches!(m.role, crate::message::Role::User))
                .map(|m| m.content.clone())
                .unwrap_or_default();
            return Ok(LlmResponse::text(format!("ok: {last_user}")));
        }
        if responses.len() == 1 {
            Ok(responses[0].clone())
        } else {
            Ok(responses.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: with no scripted responses, MockLlm echoes the last user message.
    #[tokio::test]
    async fn mock_llm_echoes_last_user_message_by_default() {
        let llm = MockLlm::new(vec![]);
        let msgs = vec![Message::system("sys"), Message::user("hello")];
        let resp = llm.complete(&msgs, None, "test-model").await.unwrap();
        assert_eq!(resp.content, "ok: hello");
        assert_eq!(llm.call_count(), 1);
    }

    /// **Scenario**: scripted responses are returned in order, one per call.
    #[tokio::test]
    async fn mock_llm_returns_scripted_responses_in_order() {
        let llm = MockLlm::new(vec![LlmResponse::text("first"), LlmResponse::text("second")]);
        let msgs = vec![Message::user("x")];
        let r1 = llm.complete(&msgs, None, "m").await.unwrap();
        let r2 = llm.complete(&msgs, None, "m").await.unwrap();
        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "second");
    }
}
