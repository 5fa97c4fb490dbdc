//! Knowledge base access
//!
//! Wraps the external vector document store behind the normalized `SearchHit`
//! shape. The store itself (embedding, persistence, ranking) is a black box
//! reached through the `DocumentStore` trait; `InMemoryStore` is a
//! development and test stand-in, not a storage engine.

use crate::types::RetrievalResult;
use async_trait::async_trait;
use reportify_core::{
    with_timeout, DocumentStore, HitSource, SearchHit, StoreQueryResult, StoredDocument,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Maximum snippet length for knowledge-base hits, in characters
const SNIPPET_CHARS: usize = 200;

/// Query timeout against the backing store, in milliseconds
const STORE_QUERY_TIMEOUT_MS: u64 = 10_000;

/// Knowledge base handle mapping store hits into normalized `SearchHit`s
pub struct KnowledgeBase {
    store: Arc<dyn DocumentStore>,
}

impl KnowledgeBase {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Nearest-neighbor search, normalized. `distance` is copied from the
    /// store (smaller = closer); the snippet is the first 200 characters of
    /// the chunk content with an ellipsis when truncated.
    pub async fn search(&self, query: &str, k: usize) -> RetrievalResult<Vec<SearchHit>> {
        debug!("Searching knowledge base for: {}", query);

        let result = with_timeout(
            self.store.query(query, k),
            STORE_QUERY_TIMEOUT_MS,
            "knowledge_base_query",
        )
        .await??;

        let mut hits = Vec::new();
        for (i, content) in result.documents.iter().enumerate() {
            let metadata = result.metadatas.get(i);
            let title = metadata
                .and_then(|m| m.get("title"))
                .cloned()
                .unwrap_or_else(|| "未知".to_string());
            let url = metadata
                .and_then(|m| m.get("source"))
                .cloned()
                .unwrap_or_default();

            hits.push(SearchHit {
                title,
                url,
                snippet: truncate_snippet(content),
                full_text: Some(content.clone()),
                source: HitSource::KnowledgeBase,
                distance: result.distances.get(i).copied(),
            });
        }

        info!("Knowledge base returned {} hits for '{}'", hits.len(), query);
        Ok(hits)
    }

    /// Direct access to the underlying store
    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }
}

fn truncate_snippet(content: &str) -> String {
    let mut snippet: String = content.chars().take(SNIPPET_CHARS).collect();
    if content.chars().count() > SNIPPET_CHARS {
        snippet.push_str("...");
    }
    snippet
}

/// In-memory document store stand-in.
///
/// Ranks by naive term overlap between query and chunk content. Real
/// deployments implement `DocumentStore` against an actual vector database;
/// this impl exists so the pipeline runs end-to-end without one.
#[derive(Default)]
pub struct InMemoryStore {
    documents: RwLock<Vec<StoredDocument>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn score(query: &str, content: &str) -> f32 {
        let terms: Vec<&str> = query.split_whitespace().filter(|t| !t.is_empty()).collect();
        if terms.is_empty() {
            return 0.0;
        }
        let matched = terms.iter().filter(|t| content.contains(**t)).count();
        matched as f32 / terms.len() as f32
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn add(
        &self,
        texts: Vec<String>,
        metadatas: Vec<HashMap<String, String>>,
        ids: Vec<String>,
    ) -> reportify_core::ReportifyResult<()> {
        if texts.len() != metadatas.len() || texts.len() != ids.len() {
            return Err(reportify_core::ReportifyError::Store {
                message: "texts, metadatas and ids must have equal lengths".to_string(),
                source: None,
                context: reportify_core::ErrorContext::new("in_memory_store")
                    .with_operation("add"),
            });
        }

        let mut documents = self.documents.write().await;
        for ((content, metadata), id) in texts.into_iter().zip(metadatas).zip(ids) {
            documents.push(StoredDocument {
                id,
                content,
                metadata,
            });
        }
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> reportify_core::ReportifyResult<StoreQueryResult> {
        let documents = self.documents.read().await;

        let mut scored: Vec<(&StoredDocument, f32)> = documents
            .iter()
            .map(|doc| (doc, Self::score(text, &doc.content)))
            .collect();
        // Higher overlap first, expressed as distance below
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        let mut result = StoreQueryResult::default();
        for (doc, score) in scored {
            result.ids.push(doc.id.clone());
            result.documents.push(doc.content.clone());
            result.metadatas.push(doc.metadata.clone());
            result.distances.push(1.0 - score);
        }
        Ok(result)
    }

    async fn get_all(&self) -> reportify_core::ReportifyResult<Vec<StoredDocument>> {
        Ok(self.documents.read().await.clone())
    }

    async fn delete_collection(&self) -> reportify_core::ReportifyResult<()> {
        self.documents.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> reportify_core::ReportifyResult<usize> {
        Ok(self.documents.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(title: &str, source: &str) -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("title".to_string(), title.to_string());
        m.insert("source".to_string(), source.to_string());
        m
    }

    #[tokio::test]
    async fn test_in_memory_store_ranks_by_overlap() {
        let store = InMemoryStore::new();
        store
            .add(
                vec![
                    "quantum computing policy overview".to_string(),
                    "cooking recipes for beginners".to_string(),
                ],
                vec![meta("政策", "doc_a.txt"), meta("食谱", "doc_b.txt")],
                vec!["doc_0".to_string(), "doc_1".to_string()],
            )
            .await
            .unwrap();

        let result = store.query("quantum policy", 2).await.unwrap();
        assert_eq!(result.ids[0], "doc_0");
        assert!(result.distances[0] < result.distances[1]);
    }

    #[tokio::test]
    async fn test_knowledge_base_normalizes_hits() {
        let store = Arc::new(InMemoryStore::new());
        let long_content = "量".repeat(250);
        store
            .add(
                vec![long_content.clone()],
                vec![meta("量子报告", "kb_doc.docx")],
                vec!["doc_0".to_string()],
            )
            .await
            .unwrap();

        let kb = KnowledgeBase::new(store);
        let hits = kb.search("量", 3).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, HitSource::KnowledgeBase);
        assert_eq!(hits[0].title, "量子报告");
        assert_eq!(hits[0].url, "kb_doc.docx");
        assert!(hits[0].distance.is_some());
        // 250-char content truncated to 200 chars plus ellipsis
        assert_eq!(hits[0].snippet.chars().count(), 203);
        assert!(hits[0].snippet.ends_with("..."));
        assert_eq!(hits[0].full_text.as_deref(), Some(long_content.as_str()));
    }

    #[tokio::test]
    async fn test_synthetic_identity_for_missing_source() {
        let store = Arc::new(InMemoryStore::new());
        store
            .add(
                vec!["content".to_string()],
                vec![{
                    let mut m = HashMap::new();
                    m.insert("title".to_string(), "孤本".to_string());
                    m
                }],
                vec!["doc_0".to_string()],
            )
            .await
            .unwrap();

        let kb = KnowledgeBase::new(store);
        let hits = kb.search("content", 1).await.unwrap();
        assert_eq!(hits[0].identity_key(), "kb:孤本");
    }

    #[tokio::test]
    async fn test_delete_collection_clears() {
        let store = InMemoryStore::new();
        store
            .add(
                vec!["a".to_string()],
                vec![HashMap::new()],
                vec!["doc_0".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        store.delete_collection().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.get_all().await.unwrap().is_empty());
    }
}
