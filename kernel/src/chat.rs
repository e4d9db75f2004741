//! Chat publisher: the collaborator the friend scheduler and planned-agent tools
//! send outbound messages through (§6). `chat_id == ""` targets the default
//! conversation.

use async_trait::async_trait;

use crate::error::ActivityError;

#[async_trait]
pub trait ChatPublisher: Send + Sync {
    async fn send_assistant(
        &self,
        chat_id: &str,
        text: &str,
        image_urls: Option<Vec<String>>,
    ) -> Result<(), ActivityError>;

    /// The most recent user (not assistant) message in `chat_id`, with its unix
    /// timestamp, if any (§4.6 step 3c: "if the most recent user-chat message in the
    /// bound chat is newer than the latest incoming network message, prepend it as
    /// context").
    async fn latest_user_message(&self, chat_id: &str) -> Result<Option<(String, i64)>, ActivityError>;
}

/// In-memory publisher for tests: records every send for assertions, never fails.
#[derive(Default)]
pub struct RecordingChatPublisher {
    sent: std::sync::Mutex<Vec<(String, String, Vec<String>)>>,
    user_messages: std::sync::Mutex<std::collections::HashMap<String, (String, i64)>>,
}

impl RecordingChatPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String, Vec<String>)> {
        self.sent.lock().unwrap().clone()
    }

    /// Seeds the most recent user message for `chat_id`, as if the user had sent it.
    pub fn seed_user_message(&self, chat_id: &str, text: &str, timestamp: i64) {
        self.user_messages
            .lock()
            .unwrap()
            .insert(chat_id.to_string(), (text.to_string(), timestamp));
    }
}

#[async_trait]
impl ChatPublisher for RecordingChatPublisher {
    async fn send_assistant(
        &self,
        chat_id: &str,
        text: &str,
        image_urls: Option<Vec<String>>,
    ) -> Result<(), ActivityError> {
        self.sent.lock().unwrap().push((
            chat_id.to_string(),
            text.to_string(),
            image_urls.unwrap_or_default(),
        ));
        Ok(())
    }

    async fn latest_user_message(&self, chat_id: &str) -> Result<Option<(String, i64)>, ActivityError> {
        Ok(self.user_messages.lock().unwrap().get(chat_id).cloned())
    }
}
