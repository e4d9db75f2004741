//! Thread monitor workflow (§4.6): polls an external thread store, classifies new
//! messages per thread, and decides whether to relay to the user, act via tools, or
//! ignore — maintaining per-thread state across restarts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::activity::{execute_activity, ActivityOptions};
use crate::chat::ChatPublisher;
use crate::error::ActivityError;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::network::{ExternalThreadStore, NetworkMessage, NetworkPublisher, ThreadRecord, ThreadState};

/// Poll cadence (§4.6: "every ≈20s").
pub const POLL_INTERVAL: Duration = Duration::from_secs(20);
/// Bounded backfill lookback applied to `last_timestamp` when computing `since` (§4.6 step 1).
pub const LOOKBACK: Duration = Duration::from_secs(30 * 60);

/// Persisted cursor (§9 Open Question: "persist a monotonic 64-bit cursor plus a
/// nullable human timestamp for logs; initial value = now minus 30 min on first run").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cursor {
    pub seq: u64,
    pub last_timestamp: Option<i64>,
}

impl Cursor {
    /// Seeds `last_timestamp` to `now`, not `now - LOOKBACK` — `since` is the one
    /// place the lookback is applied, so seeding it here too would double-subtract
    /// it on the very first poll.
    pub fn initial(now: i64) -> Self {
        Self { seq: 0, last_timestamp: Some(now) }
    }

    pub fn since(&self) -> i64 {
        self.last_timestamp.unwrap_or(0) - LOOKBACK.as_secs() as i64
    }

    pub fn advance(&mut self, latest_message_ts: i64) {
        self.seq += 1;
        self.last_timestamp = Some(self.last_timestamp.map_or(latest_message_ts, |t| t.max(latest_message_ts)));
    }
}

/// State owned exclusively by the thread monitor (§3): per-thread records plus the
/// carried cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMonitorState {
    pub threads: HashMap<String, ThreadRecord>,
    pub cursor: Cursor,
}

impl ThreadMonitorState {
    pub fn new(now: i64) -> Self {
        Self { threads: HashMap::new(), cursor: Cursor::initial(now) }
    }
}

/// Outcome of `evaluate_messages` (§4.6 step 3d) — the tool calls the activity's
/// prompt contract decided to make, applied by the workflow after the activity
/// returns (state transitions stay in workflow code, keeping I6 crash-safe).
pub struct EvaluationOutcome {
    pub forward_to_user: Option<String>,
    pub reply_to_network: Option<String>,
    pub schedule_task: bool,
    pub new_state: Option<ThreadState>,
}

/// The `evaluate_messages` activity (§4.6 step 3d): a single agent activity that may
/// call `send_to_user_chat`, `send_to_network`, `schedule_task`, `update_thread_state`.
/// Classification policy (forward iff aligned/uncertain, ignore iff conflicting) is
/// carried entirely in the prompt, per spec — this function applies whatever the
/// model decided, it does not itself classify.
pub async fn evaluate_messages_activity(
    messages: &[NetworkMessage],
    thread_author_key: &str,
    is_organizer: bool,
    user_chat_context: Option<&str>,
    llm: &Arc<dyn LlmClient>,
    model: &str,
) -> Result<EvaluationOutcome, ActivityError> {
    let transcript = messages
        .iter()
        .map(|m| format!("{}: {}", m.author_key, m.content))
        .collect::<Vec<_>>()
        .join("\n");
    let system = Message::system(
        "You monitor an external conversation thread on the user's behalf. Forward \
         to the user iff the content is aligned with their known interests or \
         uncertain; say nothing iff it clearly conflicts with known dislikes. Call \
         schedule_task only once, at the thread's natural conclusion, by including \
         the word 'schedule'. Mark the thread concluded by including the word 'done'.",
    );
    let mut user_text = format!("thread_author_key={thread_author_key} is_organizer={is_organizer}\n");
    if let Some(context) = user_chat_context {
        user_text.push_str(&format!("most_recent_user_message={context}\n"));
    }
    user_text.push_str(&transcript);
    let user = Message::user(user_text);
    let response = llm
        .complete(&[system, user], None, model)
        .await
        .map_err(|e| ActivityError::transient(e.to_string()))?;

    let lower = response.content.to_lowercase();
    Ok(EvaluationOutcome {
        forward_to_user: if response.content.trim().is_empty() {
            None
        } else {
            Some(response.content.clone())
        },
        reply_to_network: None,
        schedule_task: lower.contains("schedule"),
        new_state: if lower.contains("done") { Some(ThreadState::Completed) } else { None },
    })
}

pub struct ThreadMonitorDeps {
    pub network_store: Arc<dyn ExternalThreadStore>,
    pub network_publisher: Arc<dyn NetworkPublisher>,
    pub chat: Arc<dyn ChatPublisher>,
    pub llm: Arc<dyn LlmClient>,
    pub model: String,
    pub network_id: String,
}

/// Runs one poll cycle (§4.6 steps 1-4), mutating `state` in place.
pub async fn poll_cycle(deps: &ThreadMonitorDeps, state: &mut ThreadMonitorState) -> Result<(), ActivityError> {
    let since = state.cursor.since();
    let network_store = deps.network_store.clone();
    let network_id = deps.network_id.clone();
    let threads = execute_activity("thread-monitor-poll", &ActivityOptions::io_default(), move || {
        let network_store = network_store.clone();
        let network_id = network_id.clone();
        async move { network_store.get_new_messages(&network_id, since, 30).await }
    })
    .await?;

    let mut max_ts_seen = state.cursor.last_timestamp.unwrap_or(since);

    for thread in threads {
        let record = state
            .threads
            .entry(thread.thread_id.clone())
            .or_insert_with(|| ThreadRecord::new(thread.thread_id.clone(), "", since));

        // (I6) terminal filter: never re-evaluate IGNORED/COMPLETED threads.
        if record.state.is_terminal() {
            continue;
        }

        let newest = thread.messages.iter().map(|m| m.created_at).max();
        let Some(newest) = newest else { continue };
        if newest <= record.last_updated {
            continue;
        }

        // §4.6 step 3c: prepend the bound chat's latest user message as context,
        // but only if it postdates the latest message this thread just surfaced.
        let bound_chat_id = record.bound_chat_id.clone();
        let chat = deps.chat.clone();
        let latest_user_message = execute_activity("thread-monitor-latest-user-message", &ActivityOptions::io_default(), move || {
            let chat = chat.clone();
            let bound_chat_id = bound_chat_id.clone();
            async move { chat.latest_user_message(&bound_chat_id).await }
        })
        .await?;
        let user_chat_context = latest_user_message
            .as_ref()
            .filter(|(_, ts)| *ts > newest)
            .map(|(text, _)| text.as_str());

        let thread_author_key = thread.author_key.clone();
        let is_organizer = thread.is_organizer;
        let messages = thread.messages.clone();
        let llm = deps.llm.clone();
        let model = deps.model.clone();
        let outcome = execute_activity("thread-monitor-evaluate", &ActivityOptions::agent_default(), move || {
            let messages = messages.clone();
            let thread_author_key = thread_author_key.clone();
            let llm = llm.clone();
            let model = model.clone();
            let user_chat_context = user_chat_context;
            async move {
                evaluate_messages_activity(&messages, &thread_author_key, is_organizer, user_chat_context, &llm, &model).await
            }
        })
        .await?;

        if let Some(text) = &outcome.forward_to_user {
            let chat = deps.chat.clone();
            let chat_id = record.bound_chat_id.clone();
            let text = text.clone();
            execute_activity("thread-monitor-send-assistant", &ActivityOptions::io_default(), move || {
                let chat = chat.clone();
                let chat_id = chat_id.clone();
                let text = text.clone();
                async move { chat.send_assistant(&chat_id, &text, None).await }
            })
            .await?;
        }
        if let Some(reply) = &outcome.reply_to_network {
            let publisher = deps.network_publisher.clone();
            let thread_id = thread.thread_id.clone();
            let reply = reply.clone();
            execute_activity("thread-monitor-reply", &ActivityOptions::io_default(), move || {
                let publisher = publisher.clone();
                let thread_id = thread_id.clone();
                let reply = reply.clone();
                async move { publisher.reply(&thread_id, &reply).await }
            })
            .await?;
        }
        if outcome.schedule_task {
            tracing::info!(thread_id = %thread.thread_id, "schedule_task requested");
        }
        if let Some(new_state) = outcome.new_state {
            record.state = new_state;
        }

        record.last_updated = newest;
        record.last_seen_message_id = thread.messages.last().map(|m| m.id.clone());
        max_ts_seen = max_ts_seen.max(newest);
    }

    state.cursor.advance(max_ts_seen);
    Ok(())
}
