//! External thread store collaborator (§3, §6) and per-thread state owned by the
//! thread monitor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ActivityError;

/// A message in an external thread (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkMessage {
    pub id: String,
    pub thread_id: String,
    pub author_key: String,
    pub content: String,
    pub created_at: i64,
    pub is_mine: bool,
    pub signature: Option<String>,
}

/// A thread with its ordered messages, as returned by `get_new_messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkThread {
    pub thread_id: String,
    pub author_key: String,
    pub is_organizer: bool,
    pub messages: Vec<NetworkMessage>,
}

/// `IGNORED`/`COMPLETED` are terminal filters: the thread is never re-evaluated once
/// it reaches either (§3, I6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadState {
    None,
    Ignored,
    Completed,
}

impl ThreadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ThreadState::Ignored | ThreadState::Completed)
    }
}

/// Per-thread bookkeeping owned exclusively by the thread monitor workflow (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub thread_id: String,
    pub state: ThreadState,
    pub last_seen_message_id: Option<String>,
    pub last_updated: i64,
    pub bound_chat_id: String,
}

impl ThreadRecord {
    pub fn new(thread_id: impl Into<String>, bound_chat_id: impl Into<String>, now: i64) -> Self {
        Self {
            thread_id: thread_id.into(),
            state: ThreadState::None,
            last_seen_message_id: None,
            last_updated: now,
            bound_chat_id: bound_chat_id.into(),
        }
    }
}

/// The external-thread-store collaborator (§6 `get_new_messages`).
#[async_trait]
pub trait ExternalThreadStore: Send + Sync {
    async fn get_new_messages(
        &self,
        network_id: &str,
        since: i64,
        limit: usize,
    ) -> Result<Vec<NetworkThread>, ActivityError>;
}

/// Companion collaborator for the `send_to_network` tool available to
/// `evaluate_messages` (§4.6 step 3d). Not separately contracted in §6, which only
/// names the read side (`get_new_messages`); this is the symmetric write side the
/// thread monitor's tool set requires.
#[async_trait]
pub trait NetworkPublisher: Send + Sync {
    async fn reply(&self, thread_id: &str, content: &str) -> Result<(), ActivityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario** (I6 precondition): only IGNORED/COMPLETED are terminal filters.
    #[test]
    fn only_ignored_and_completed_are_terminal() {
        assert!(!ThreadState::None.is_terminal());
        assert!(ThreadState::Ignored.is_terminal());
        assert!(ThreadState::Completed.is_terminal());
    }
}
