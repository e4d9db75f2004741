//! Periodic friend scheduler (§4.5): samples a random activity under anti-repetition
//! constraints derived from the vector memory, and sends the result to the user's
//! chat.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activity::{execute_activity, ActivityOptions};
use crate::chat::ChatPublisher;
use crate::error::ActivityError;
use crate::llm::LlmClient;
use crate::memory::{DocRecord, MemoryStore};
use crate::message::Message;
use crate::tools::image_generate::ImageGenerator;
use crate::tools::question_pool::DEFAULT_QUESTIONS;

/// Default tick cadence (§4.5: "default every 20s").
pub const TICK_INTERVAL: Duration = Duration::from_secs(20);
pub const MIN_WAIT_SECS: u64 = 1;
pub const MAX_WAIT_SECS: u64 = 15;

/// The similarity-gate threshold and metadata key are part of the contract (§4.5, I5).
pub const SIMILARITY_THRESHOLD: f64 = 0.15;
pub const FRIEND_METADATA_TYPE: &str = "friend";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Poke,
    MemoryPicture,
    Question,
}

/// Append-only record of one friend-scheduler send, also mirrored into memory (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendActivityRecord {
    pub chat_id: String,
    pub activity_type: ActivityType,
    pub timestamp: i64,
}

/// `{poke, memory_picture, question}` weights, default 3/1/5 (§4.5 step 3).
#[derive(Debug, Clone, Copy)]
pub struct ActivityWeights {
    pub poke: u32,
    pub memory_picture: u32,
    pub question: u32,
}

impl Default for ActivityWeights {
    fn default() -> Self {
        Self { poke: 3, memory_picture: 1, question: 5 }
    }
}

/// Picks a random wait duration uniform in `[MIN_WAIT, MAX_WAIT]` — an activity,
/// since RNG must never run inside workflow code (§4.5 last line).
pub fn pick_wait_activity() -> Duration {
    let secs = rand::thread_rng().gen_range(MIN_WAIT_SECS..=MAX_WAIT_SECS);
    Duration::from_secs(secs)
}

/// Weighted pick of one activity type. Falls back to uniform if all weights are
/// zero (§9 Open Question: "treat weights as authoritative when provided, fall back
/// to uniform otherwise").
pub fn pick_activity_type(weights: ActivityWeights) -> ActivityType {
    let total = weights.poke + weights.memory_picture + weights.question;
    let mut rng = rand::thread_rng();
    if total == 0 {
        return match rng.gen_range(0..3) {
            0 => ActivityType::Poke,
            1 => ActivityType::MemoryPicture,
            _ => ActivityType::Question,
        };
    }
    let mut roll = rng.gen_range(0..total);
    if roll < weights.poke {
        return ActivityType::Poke;
    }
    roll -= weights.poke;
    if roll < weights.memory_picture {
        return ActivityType::MemoryPicture;
    }
    ActivityType::Question
}

pub fn pick_question_activity() -> String {
    let idx = rand::thread_rng().gen_range(0..DEFAULT_QUESTIONS.len());
    DEFAULT_QUESTIONS[idx].to_string()
}

pub fn pick_memory_index(len: usize) -> usize {
    if len == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Applies the similarity gate to candidate text `m` (§4.5, I5): queries memory,
/// filters to `metadata.type == friend`, and blocks sending if any match has
/// distance below [`SIMILARITY_THRESHOLD`].
pub async fn similarity_gate(memory: &Arc<dyn MemoryStore>, candidate: &str) -> Result<bool, ActivityError> {
    let mem = memory.clone();
    let text = candidate.to_string();
    let scored = execute_activity("friend-similarity-query", &ActivityOptions::io_default(), move || {
        let mem = mem.clone();
        let text = text.clone();
        async move {
            mem.query_with_distance(&text, 10)
                .await
                .map_err(|e| ActivityError::transient(e.to_string()))
        }
    })
    .await?;
    let blocked = scored.iter().any(|s| {
        s.doc.metadata.get("type").map(|t| t == FRIEND_METADATA_TYPE).unwrap_or(false)
            && s.distance < SIMILARITY_THRESHOLD
    });
    if blocked {
        tracing::info!(candidate, "similarity gate blocked outbound text");
    }
    Ok(!blocked)
}

async fn store_friend_memory(
    memory: &Arc<dyn MemoryStore>,
    chat_id: &str,
    activity_type: ActivityType,
    content: &str,
    now: i64,
) -> Result<(), ActivityError> {
    let mut metadata = std::collections::HashMap::new();
    metadata.insert("type".to_string(), FRIEND_METADATA_TYPE.to_string());
    metadata.insert("activity_type".to_string(), format!("{activity_type:?}").to_lowercase());
    let doc = DocRecord {
        id: format!("friend-{chat_id}-{now}"),
        source: "friend".to_string(),
        content: content.to_string(),
        timestamp: now,
        tags: vec![],
        metadata,
    };
    let mem = memory.clone();
    execute_activity("friend-store-memory", &ActivityOptions::io_default(), move || {
        let mem = mem.clone();
        let doc = doc.clone();
        async move {
            mem.store(&[doc], None)
                .await
                .map_err(|e| ActivityError::transient(e.to_string()))
        }
    })
    .await
}

/// External collaborators a friend-scheduler tick needs.
pub struct FriendDeps {
    pub chat: Arc<dyn ChatPublisher>,
    pub memory: Arc<dyn MemoryStore>,
    pub llm: Arc<dyn LlmClient>,
    pub image_gen: Arc<dyn ImageGenerator>,
    pub weights: ActivityWeights,
    pub chat_id: String,
    pub model: String,
}

/// Runs one scheduler tick (§4.5 steps 1-5). Returns the record appended, or `None`
/// if the similarity gate blocked the send.
pub async fn tick(deps: &FriendDeps, now: i64) -> Result<Option<FriendActivityRecord>, ActivityError> {
    tokio::time::sleep(pick_wait_activity()).await;

    let mem = deps.memory.clone();
    let docs = execute_activity("friend-query-context", &ActivityOptions::io_default(), move || {
        let mem = mem.clone();
        async move { Ok(mem.query("", 20).await.unwrap_or_default()) }
    })
    .await?;
    let activity_type = pick_activity_type(deps.weights);

    let sent = match activity_type {
        ActivityType::Poke => {
            let context: String = docs.iter().map(|d| d.content.clone()).collect::<Vec<_>>().join("\n");
            let messages = vec![
                Message::system("Write a short, warm check-in message to a friend."),
                Message::user(format!("Recent context:\n{context}")),
            ];
            let llm = deps.llm.clone();
            let model = deps.model.clone();
            let resp = execute_activity("friend-poke-complete", &ActivityOptions::agent_default(), move || {
                let llm = llm.clone();
                let model = model.clone();
                let messages = messages.clone();
                async move {
                    llm.complete(&messages, None, &model)
                        .await
                        .map_err(|e| ActivityError::transient(e.to_string()))
                }
            })
            .await?;
            if similarity_gate(&deps.memory, &resp.content).await? {
                send_assistant(deps, &resp.content, None).await?;
                store_friend_memory(&deps.memory, &deps.chat_id, activity_type, &resp.content, now).await?;
                true
            } else {
                false
            }
        }
        ActivityType::MemoryPicture => {
            if docs.is_empty() {
                false
            } else {
                let idx = pick_memory_index(docs.len());
                let picked = &docs[idx];
                let prompt = format!("A picture evoking: {}", picked.content);
                let image_gen = deps.image_gen.clone();
                let prompt_owned = prompt.clone();
                let url = execute_activity("friend-generate-image", &ActivityOptions::io_default(), move || {
                    let image_gen = image_gen.clone();
                    let prompt = prompt_owned.clone();
                    async move {
                        image_gen
                            .generate(&prompt)
                            .await
                            .map_err(|e| ActivityError::transient(e.to_string()))
                    }
                })
                .await?;
                let text = format!("Thinking of this: {}", picked.content);
                if similarity_gate(&deps.memory, &text).await? {
                    send_assistant(deps, &text, Some(vec![url])).await?;
                    store_friend_memory(&deps.memory, &deps.chat_id, activity_type, &text, now).await?;
                    true
                } else {
                    false
                }
            }
        }
        ActivityType::Question => {
            let question = pick_question_activity();
            if similarity_gate(&deps.memory, &question).await? {
                send_assistant(deps, &question, None).await?;
                store_friend_memory(&deps.memory, &deps.chat_id, activity_type, &question, now).await?;
                true
            } else {
                false
            }
        }
    };

    if sent {
        Ok(Some(FriendActivityRecord { chat_id: deps.chat_id.clone(), activity_type, timestamp: now }))
    } else {
        Ok(None)
    }
}

async fn send_assistant(deps: &FriendDeps, text: &str, image_urls: Option<Vec<String>>) -> Result<(), ActivityError> {
    let chat = deps.chat.clone();
    let chat_id = deps.chat_id.clone();
    let text = text.to_string();
    execute_activity("friend-send-assistant", &ActivityOptions::io_default(), move || {
        let chat = chat.clone();
        let chat_id = chat_id.clone();
        let text = text.clone();
        let image_urls = image_urls.clone();
        async move { chat.send_assistant(&chat_id, &text, image_urls).await }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::RecordingChatPublisher;
    use crate::llm::MockLlm;
    use crate::memory::{InMemoryVectorStore, NamespacedMemoryStore};
    use crate::tools::image_generate::StubImageGenerator;
    use async_trait::async_trait;

    struct FakeEmbedder;

    #[async_trait]
    impl crate::memory::Embedder for FakeEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, crate::memory::StoreError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 8];
                    for (i, b) in t.bytes().enumerate() {
                        v[i % 8] += b as f32;
                    }
                    v
                })
                .collect())
        }
        fn dimension(&self) -> usize {
            8
        }
    }

    fn make_memory() -> Arc<dyn MemoryStore> {
        let backing = Arc::new(InMemoryVectorStore::new(Arc::new(FakeEmbedder)));
        Arc::new(NamespacedMemoryStore::new(backing, vec!["u1".into(), "memories".into()]))
    }

    /// **Scenario** (S4): a candidate near a seeded friend memory is blocked; a
    /// dissimilar candidate passes.
    #[tokio::test]
    async fn s4_similarity_gate_blocks_near_duplicates() {
        let memory = make_memory();
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("type".to_string(), "friend".to_string());
        memory
            .store(
                &[DocRecord {
                    id: "seed".into(),
                    source: "friend".into(),
                    content: "Hey, how are you?".into(),
                    timestamp: 0,
                    tags: vec![],
                    metadata,
                }],
                None,
            )
            .await
            .unwrap();

        let allowed_near = similarity_gate(&memory, "Hey, how are you?").await.unwrap();
        assert!(!allowed_near);

        let allowed_far = similarity_gate(&memory, "What did you have for lunch?").await.unwrap();
        assert!(allowed_far);
    }

    /// **Scenario**: a full poke tick sends via chat and stores a friend-tagged memory,
    /// when nothing blocks it.
    #[tokio::test]
    async fn poke_tick_sends_and_records() {
        let chat = Arc::new(RecordingChatPublisher::new());
        let deps = FriendDeps {
            chat: chat.clone(),
            memory: make_memory(),
            llm: Arc::new(MockLlm::fixed("hey, thinking of you")),
            image_gen: Arc::new(StubImageGenerator),
            weights: ActivityWeights { poke: 1, memory_picture: 0, question: 0 },
            chat_id: "chat-1".into(),
            model: "mock".into(),
        };
        let record = tick(&deps, 1000).await.unwrap();
        assert!(record.is_some());
        assert_eq!(chat.sent().len(), 1);
    }

    /// **Scenario**: weighted pick with only one non-zero weight always returns that type.
    #[test]
    fn pick_activity_type_respects_exclusive_weight() {
        let weights = ActivityWeights { poke: 0, memory_picture: 0, question: 5 };
        for _ in 0..20 {
            assert_eq!(pick_activity_type(weights), ActivityType::Question);
        }
    }
}
