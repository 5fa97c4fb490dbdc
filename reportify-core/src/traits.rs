//! Core trait definitions
//!
//! The language model and the vector document store are external
//! collaborators; these traits are their contracts.

use crate::error::ReportifyResult;
use async_trait::async_trait;
use std::collections::HashMap;

/// Black-box text completion oracle consumed by all generation components
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// 单次补全：prompt 进，文本出
    async fn complete(&self, prompt: &str) -> ReportifyResult<String>;
}

/// Result of a nearest-neighbor query against the document store
#[derive(Debug, Clone, Default)]
pub struct StoreQueryResult {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<HashMap<String, String>>,
    /// Similarity distances, aligned with `ids` (smaller = closer)
    pub distances: Vec<f32>,
}

/// A stored document chunk with its metadata
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    pub metadata: HashMap<String, String>,
}

/// Vector document store contract (persistence layer is external)
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Add chunk texts with aligned metadata and ids
    async fn add(
        &self,
        texts: Vec<String>,
        metadatas: Vec<HashMap<String, String>>,
        ids: Vec<String>,
    ) -> ReportifyResult<()>;

    /// Nearest-neighbor query, returning up to `k` hits
    async fn query(&self, text: &str, k: usize) -> ReportifyResult<StoreQueryResult>;

    /// 获取全部文档
    async fn get_all(&self) -> ReportifyResult<Vec<StoredDocument>>;

    /// Drop the whole collection
    async fn delete_collection(&self) -> ReportifyResult<()>;

    /// Number of stored chunks
    async fn count(&self) -> ReportifyResult<usize>;
}
