//! Core data type definitions

use serde::{Deserialize, Serialize};

/// Where a retrieval hit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitSource {
    Web,
    KnowledgeBase,
}

/// A normalized retrieval hit from web search or the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title
    pub title: String,
    /// Result URL (may be empty for knowledge-base hits without a source URL)
    pub url: String,
    /// Short summary or content preview
    pub snippet: String,
    /// Full document text, when available
    pub full_text: Option<String>,
    /// Origin of this hit
    pub source: HitSource,
    /// Similarity distance for knowledge-base hits (lower = more similar)
    pub distance: Option<f32>,
}

impl SearchHit {
    /// Create a web search hit (no full text yet)
    pub fn web(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            full_text: None,
            source: HitSource::Web,
            distance: None,
        }
    }

    /// Identity key used for deduplication: the URL, or a synthetic
    /// `kb:<title>` URI for knowledge-base hits that have none.
    pub fn identity_key(&self) -> String {
        if self.url.is_empty() {
            format!("kb:{}", self.title)
        } else {
            self.url.clone()
        }
    }

    /// Whether this hit carries text usable by the refine engine
    pub fn has_full_text(&self) -> bool {
        self.full_text
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }
}

/// A citation source shown to the reconciler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    /// Content excerpt, shown truncated in the citation prompt
    pub content: Option<String>,
}

impl Source {
    /// Build a citation source from a retrieval hit
    pub fn from_hit(hit: &SearchHit) -> Self {
        Self {
            title: hit.title.clone(),
            url: hit.identity_key(),
            content: hit.full_text.clone().or_else(|| {
                if hit.snippet.is_empty() {
                    None
                } else {
                    Some(hit.snippet.clone())
                }
            }),
        }
    }
}

/// One titled subdivision of a report, immutable once generated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
}

/// A complete generated report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub topic: String,
    pub sections: Vec<Section>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl Report {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            sections: Vec::new(),
            generated_at: chrono::Utc::now(),
        }
    }

    /// Render the report as a single markdown document
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n", self.topic);
        for section in &self.sections {
            out.push_str(&format!("\n## {}\n\n{}\n", section.title, section.content));
        }
        out
    }
}

// ============================================================================
// Configuration types (Default impls and file IO live in config.rs)
// ============================================================================

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider type (deepseek, openai, anthropic, ollama)
    pub provider: String,
    /// Model name
    pub model: String,
    /// API key (optional, can be set via environment)
    pub api_key: Option<String>,
    /// Base URL for custom providers
    pub base_url: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search tool endpoint (returns the delimited text block format)
    pub endpoint: String,
    /// Timeout for every network-touching operation, in seconds
    pub timeout_secs: u64,
    /// Maximum results to keep per query
    pub max_results: usize,
}

/// Document store selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Persistence directory for the backing store
    pub persist_dir: std::path::PathBuf,
    /// Collection name within the store
    pub collection: String,
}

/// Report generation limits and policies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum questions processed per section (None = all generated questions)
    pub max_questions_per_section: Option<usize>,
    /// Maximum sections processed per report (None = all)
    pub max_sections: Option<usize>,
    /// How many top web results get a full-text fetch per question
    pub fetch_top_n: usize,
    /// How many knowledge-base hits to retrieve per question
    pub knowledge_base_top_k: usize,
}

/// Document ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in characters
    pub chunk_overlap: usize,
}

/// Top-level configuration for the reportify system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportifyConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub store: StoreConfig,
    pub generation: GenerationConfig,
    pub ingest: IngestConfig,
}
