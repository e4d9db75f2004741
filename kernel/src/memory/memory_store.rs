//! [`MemoryStore`]: the semantic-memory contract consumed by the rest of the kernel.
//!
//! Wraps a [`Store`] (any backend: in-memory, sqlite, sqlite-vec) behind the
//! `store` / `query` / `query_with_distance` shape the planned-agent tools, the
//! friend scheduler's similarity gate, and the thread monitor's user-profile
//! lookups all depend on. Distance is cosine distance normalized to `[0, 1]`,
//! `0.0` meaning identical — see `in_memory_vector_store::cosine_similarity`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;

use super::store::{Namespace, SearchOptions, Store, StoreError};

/// A single memory document as exchanged with callers (§6 Memory store contract).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DocRecord {
    /// Caller-assigned, deterministic per source (e.g. `x-tweet-<id>`).
    pub id: String,
    /// Origin of the document (e.g. `"twitter"`, `"mail"`, `"friend"`).
    pub source: String,
    pub content: String,
    #[serde(default = "DocRecord::default_timestamp")]
    pub timestamp: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl DocRecord {
    fn default_timestamp() -> i64 {
        0
    }
}

/// A document paired with its similarity distance to a query, `0.0` = identical.
#[derive(Debug, Clone)]
pub struct ScoredDoc {
    pub doc: DocRecord,
    pub distance: f64,
}

/// Callback invoked after each document is written, for progress reporting during bulk ingest.
pub type ProgressCallback<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Semantic memory: bulk store plus plain and distance-ranked query.
///
/// **Interaction**: built over any `Arc<dyn Store>` and a fixed namespace (e.g.
/// `[user_id, "memories"]`); the friend scheduler's similarity gate (spec §4.5)
/// and the planned-agent memory tools both go through this trait rather than
/// talking to `Store` directly, so the distance contract lives in one place.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Stores `docs`, calling `progress_cb(done, total)` after each write.
    async fn store(
        &self,
        docs: &[DocRecord],
        progress_cb: Option<ProgressCallback<'_>>,
    ) -> Result<(), StoreError>;

    /// Plain similarity query: documents most relevant to `text`, most similar first.
    async fn query(&self, text: &str, limit: usize) -> Result<Vec<DocRecord>, StoreError>;

    /// Distance-ranked query: same as `query` but pairs each doc with cosine distance in `[0, 1]`.
    async fn query_with_distance(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<ScoredDoc>, StoreError>;
}

/// Default [`MemoryStore`] implementation: a `Store` plus a fixed namespace.
pub struct NamespacedMemoryStore {
    store: Arc<dyn Store>,
    namespace: Namespace,
}

impl NamespacedMemoryStore {
    pub fn new(store: Arc<dyn Store>, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    fn to_doc(key: &str, value: &serde_json::Value) -> DocRecord {
        serde_json::from_value(value.clone()).unwrap_or_else(|_| DocRecord {
            id: key.to_string(),
            source: "unknown".to_string(),
            content: value
                .get("content")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            timestamp: 0,
            tags: Vec::new(),
            metadata: HashMap::new(),
        })
    }

    /// Converts a `Store::search` similarity score (cosine similarity, `[-1, 1]`, higher is
    /// closer) into the `[0, 1]` cosine distance contract, `0.0` = identical.
    fn distance_from_score(score: Option<f64>) -> f64 {
        match score {
            Some(similarity) => ((1.0 - similarity) / 2.0).clamp(0.0, 1.0),
            None => 0.0,
        }
    }
}

#[async_trait]
impl MemoryStore for NamespacedMemoryStore {
    async fn store(
        &self,
        docs: &[DocRecord],
        progress_cb: Option<ProgressCallback<'_>>,
    ) -> Result<(), StoreError> {
        let total = docs.len();
        for (i, doc) in docs.iter().enumerate() {
            let value = serde_json::to_value(doc)?;
            self.store.put(&self.namespace, &doc.id, &value).await?;
            if let Some(cb) = progress_cb {
                cb(i + 1, total);
            }
        }
        Ok(())
    }

    async fn query(&self, text: &str, limit: usize) -> Result<Vec<DocRecord>, StoreError> {
        let hits = self
            .store
            .search(
                &self.namespace,
                SearchOptions::new().with_query(text).with_limit(limit),
            )
            .await?;
        Ok(hits
            .into_iter()
            .map(|hit| Self::to_doc(&hit.item.key, &hit.item.value))
            .collect())
    }

    async fn query_with_distance(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<ScoredDoc>, StoreError> {
        let hits = self
            .store
            .search(
                &self.namespace,
                SearchOptions::new().with_query(text).with_limit(limit),
            )
            .await?;
        Ok(hits
            .into_iter()
            .map(|hit| ScoredDoc {
                distance: Self::distance_from_score(hit.score),
                doc: Self::to_doc(&hit.item.key, &hit.item.value),
            })
            .collect())
    }
}

#[allow(dead_code)]
fn _unused_timestamp_hint(_: SystemTime) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Embedder, InMemoryVectorStore};

    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
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

    fn ns() -> Namespace {
        vec!["u1".into(), "memories".into()]
    }

    /// **Scenario**: a stored doc is returned verbatim by `query`, ignoring ordering of fields.
    #[tokio::test]
    async fn store_then_query_roundtrips_id() {
        let backing = Arc::new(InMemoryVectorStore::new(Arc::new(FakeEmbedder)));
        let mem = NamespacedMemoryStore::new(backing, ns());
        let doc = DocRecord {
            id: "x-tweet-1".into(),
            source: "twitter".into(),
            content: "Hey, how are you?".into(),
            timestamp: 100,
            tags: vec![],
            metadata: [("type".to_string(), "friend".to_string())].into(),
        };
        mem.store(&[doc.clone()], None).await.unwrap();
        let found = mem.query("Hey, how are you?", 5).await.unwrap();
        assert!(found.iter().any(|d| d.id == "x-tweet-1"));
    }

    /// **Scenario**: an identical query returns distance 0 (cosine similarity 1.0).
    #[tokio::test]
    async fn identical_text_has_zero_distance() {
        let backing = Arc::new(InMemoryVectorStore::new(Arc::new(FakeEmbedder)));
        let mem = NamespacedMemoryStore::new(backing, ns());
        let doc = DocRecord {
            id: "d1".into(),
            source: "friend".into(),
            content: "Hey, how are you?".into(),
            timestamp: 0,
            tags: vec![],
            metadata: HashMap::new(),
        };
        mem.store(&[doc], None).await.unwrap();
        let scored = mem.query_with_distance("Hey, how are you?", 1).await.unwrap();
        assert_eq!(scored.len(), 1);
        assert!(scored[0].distance < 1e-6);
    }

    /// **Scenario**: progress_cb is invoked once per document, in order.
    #[tokio::test]
    async fn store_reports_progress_per_doc() {
        let backing = Arc::new(InMemoryVectorStore::new(Arc::new(FakeEmbedder)));
        let mem = NamespacedMemoryStore::new(backing, ns());
        let docs: Vec<DocRecord> = (0..3)
            .map(|i| DocRecord {
                id: format!("d{i}"),
                source: "test".into(),
                content: format!("content {i}"),
                timestamp: i,
                tags: vec![],
                metadata: HashMap::new(),
            })
            .collect();
        let seen = std::sync::Mutex::new(Vec::new());
        let cb = |done: usize, total: usize| seen.lock().unwrap().push((done, total));
        mem.store(&docs, Some(&cb)).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }
}
