//! Document ingestion into the knowledge base
//!
//! Loads documents by type, chunks them uniformly, and stores the chunks
//! with their metadata through the `DocumentStore` contract.

use crate::gateway::RetrievalGateway;
use crate::types::{FetchOutcome, RetrievalError, RetrievalResult};
use reportify_core::{DocumentStore, IngestConfig, StoredDocument};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Supported document types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocType {
    Pdf,
    Docx,
    Url,
    Txt,
}

impl FromStr for DocType {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(DocType::Pdf),
            "docx" => Ok(DocType::Docx),
            "url" => Ok(DocType::Url),
            "txt" => Ok(DocType::Txt),
            other => Err(RetrievalError::UnsupportedDocType(other.to_string())),
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DocType::Pdf => "pdf",
            DocType::Docx => "docx",
            DocType::Url => "url",
            DocType::Txt => "txt",
        };
        write!(f, "{}", s)
    }
}

/// Split text into character windows of `chunk_size` with `overlap`
/// characters shared between consecutive chunks.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Loads, chunks and stores documents
pub struct DocumentIngestor {
    store: Arc<dyn DocumentStore>,
    gateway: Arc<RetrievalGateway>,
    config: IngestConfig,
}

impl DocumentIngestor {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        gateway: Arc<RetrievalGateway>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    /// Process one document: load by type, chunk, store. Returns the number
    /// of chunks written.
    pub async fn process_document(
        &self,
        location: &str,
        doc_type: DocType,
        title: Option<&str>,
        notes: Option<&str>,
        summary: Option<&str>,
    ) -> RetrievalResult<usize> {
        info!("Ingesting {} document: {}", doc_type, location);

        let text = self.load_text(location, doc_type).await?;
        let chunks = chunk_text(&text, self.config.chunk_size, self.config.chunk_overlap);

        if chunks.is_empty() {
            return Err(RetrievalError::Fetch(format!(
                "Document contained no text: {}",
                location
            )));
        }

        let current_count = self.store.count().await?;

        let mut texts = Vec::with_capacity(chunks.len());
        let mut metadatas = Vec::with_capacity(chunks.len());
        let mut ids = Vec::with_capacity(chunks.len());

        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut metadata = HashMap::new();
            metadata.insert("source".to_string(), location.to_string());
            metadata.insert(
                "title".to_string(),
                title.unwrap_or(location).to_string(),
            );
            metadata.insert("doc_type".to_string(), doc_type.to_string());
            metadata.insert("chunk".to_string(), i.to_string());
            metadata.insert("notes".to_string(), notes.unwrap_or("").to_string());
            metadata.insert("summary".to_string(), summary.unwrap_or("").to_string());

            texts.push(chunk);
            metadatas.push(metadata);
            ids.push(format!("doc_{}", current_count + i));
        }

        let written = texts.len();
        self.store.add(texts, metadatas, ids).await?;

        info!("Ingested {} chunks from {}", written, location);
        Ok(written)
    }

    async fn load_text(&self, location: &str, doc_type: DocType) -> RetrievalResult<String> {
        match doc_type {
            DocType::Txt => {
                let text = tokio::fs::read_to_string(location).await?;
                Ok(text)
            }
            DocType::Pdf => {
                let path = location.to_string();
                let text = tokio::task::spawn_blocking(move || {
                    pdf_extract::extract_text(&path)
                })
                .await
                .map_err(|e| RetrievalError::Fetch(format!("PDF extraction task failed: {}", e)))?
                .map_err(|e| RetrievalError::Fetch(format!("PDF extraction failed: {}", e)))?;
                Ok(text)
            }
            DocType::Url => match self.gateway.fetch_full_text(location).await {
                FetchOutcome::Extracted(text) => Ok(text),
                FetchOutcome::NothingExtractable => Err(RetrievalError::Fetch(format!(
                    "No extractable text at {}",
                    location
                ))),
                FetchOutcome::Failed { reason } => Err(RetrievalError::Fetch(reason)),
            },
            DocType::Docx => Err(RetrievalError::UnsupportedDocType(
                "docx (convert to pdf or txt first)".to_string(),
            )),
        }
    }

    /// 获取数据库中的所有文档
    pub async fn get_all_documents(&self) -> RetrievalResult<Vec<StoredDocument>> {
        Ok(self.store.get_all().await?)
    }

    /// 清除当前 collection 中的所有数据
    pub async fn clear_collection(&self) -> RetrievalResult<()> {
        debug!("Clearing document collection");
        Ok(self.store.delete_collection().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use reportify_core::SearchConfig;

    fn test_gateway() -> Arc<RetrievalGateway> {
        let config = SearchConfig {
            endpoint: "http://localhost:9/search".to_string(),
            timeout_secs: 1,
            max_results: 5,
        };
        Arc::new(RetrievalGateway::from_config(config).unwrap())
    }

    fn test_ingest_config() -> IngestConfig {
        IngestConfig {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }

    #[test]
    fn test_chunk_text_short_input_single_chunk() {
        let chunks = chunk_text("short text", 1000, 200);
        assert_eq!(chunks, vec!["short text".to_string()]);
    }

    #[test]
    fn test_chunk_text_empty_input() {
        assert!(chunk_text("", 1000, 200).is_empty());
    }

    #[test]
    fn test_chunk_text_overlap() {
        let text: String = ('a'..='z').collect();
        let chunks = chunk_text(&text, 10, 4);

        assert_eq!(chunks[0], "abcdefghij");
        // Next chunk starts chunk_size - overlap = 6 characters in
        assert_eq!(chunks[1], "ghijklmnop");
        // Every character of the input appears in some chunk
        let joined: String = chunks.concat();
        for c in text.chars() {
            assert!(joined.contains(c));
        }
    }

    #[test]
    fn test_chunk_text_multibyte_safe() {
        let text = "量子计算".repeat(10);
        let chunks = chunk_text(&text, 7, 2);
        assert!(!chunks.is_empty());
        assert!(chunks[0].chars().count() <= 7);
    }

    #[tokio::test]
    async fn test_ingest_txt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "量子计算最新进展。".repeat(200)).unwrap();

        let store = Arc::new(InMemoryStore::new());
        let ingestor = DocumentIngestor::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            test_gateway(),
            test_ingest_config(),
        );

        let written = ingestor
            .process_document(
                path.to_str().unwrap(),
                DocType::Txt,
                Some("量子计算研究报告"),
                None,
                Some("量子计算发展综述"),
            )
            .await
            .unwrap();

        assert!(written > 1);

        let all = ingestor.get_all_documents().await.unwrap();
        assert_eq!(all.len(), written);
        assert_eq!(all[0].id, "doc_0");
        assert_eq!(
            all[0].metadata.get("title").map(|s| s.as_str()),
            Some("量子计算研究报告")
        );
        assert_eq!(all[0].metadata.get("doc_type").map(|s| s.as_str()), Some("txt"));
    }

    #[tokio::test]
    async fn test_ids_continue_from_existing_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "short document").unwrap();

        let store = Arc::new(InMemoryStore::new());
        let ingestor = DocumentIngestor::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            test_gateway(),
            test_ingest_config(),
        );

        ingestor
            .process_document(path.to_str().unwrap(), DocType::Txt, None, None, None)
            .await
            .unwrap();
        ingestor
            .process_document(path.to_str().unwrap(), DocType::Txt, None, None, None)
            .await
            .unwrap();

        let all = ingestor.get_all_documents().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].id, "doc_1");
    }

    #[tokio::test]
    async fn test_docx_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let ingestor = DocumentIngestor::new(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            test_gateway(),
            test_ingest_config(),
        );

        let result = ingestor
            .process_document("report.docx", DocType::Docx, None, None, None)
            .await;
        assert!(matches!(
            result,
            Err(RetrievalError::UnsupportedDocType(_))
        ));
    }

    #[test]
    fn test_doc_type_from_str() {
        assert_eq!(DocType::from_str("PDF").unwrap(), DocType::Pdf);
        assert_eq!(DocType::from_str("txt").unwrap(), DocType::Txt);
        assert!(DocType::from_str("epub").is_err());
    }
}
