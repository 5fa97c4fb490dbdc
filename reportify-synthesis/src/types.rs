//! Type definitions for the synthesis layer

use reportify_core::{ReportifyError, SearchHit};
use reportify_retrieval::RetrievalError;
use serde::{Deserialize, Serialize};

/// Error types for the synthesis layer
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(Box<ReportifyError>),
}

impl From<ReportifyError> for SynthesisError {
    fn from(err: ReportifyError) -> Self {
        SynthesisError::Core(Box::new(err))
    }
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;

/// The accumulating text produced by a refine chain.
///
/// Deliberately not `Clone`: a draft is owned by exactly one in-flight chain
/// and is threaded by value through the engine, so two chains can never fold
/// into the same draft.
#[derive(Debug, PartialEq, Eq)]
pub struct Draft(String);

impl Draft {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Draft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the question generator arrived at its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseOutcome {
    /// Questions were extracted from the model's marked-up response
    Parsed,
    /// The model call or parsing failed and the deterministic fallback set was used
    Fallback,
}

/// Output of the question generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestions {
    /// Ordered sub-questions, 3 to 5 of them
    pub questions: Vec<String>,
    /// The model's extracted thinking segments, possibly empty
    pub rationale: Vec<String>,
    pub outcome: ParseOutcome,
}

/// Result of citation reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciled {
    /// The answer, possibly augmented with inline `[n]` markers
    pub final_answer: String,
    /// The numbered reference list, empty when the split header was absent
    pub citation_block: String,
}

/// Search mode for the chat answer path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// Let the model decide whether a web search is needed
    Auto,
    /// Always search the web
    Web,
    /// Knowledge base only
    KnowledgeBase,
}

impl std::str::FromStr for SearchMode {
    type Err = SynthesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(SearchMode::Auto),
            "web" => Ok(SearchMode::Web),
            "knowledge_base" | "kb" => Ok(SearchMode::KnowledgeBase),
            other => Err(SynthesisError::Config(format!(
                "Unknown search mode: {}",
                other
            ))),
        }
    }
}

/// Complete result of the chat answer path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub query: String,
    pub answer: String,
    pub citation: String,
    pub search_results: Vec<SearchHit>,
    pub knowledge_base_results: Vec<SearchHit>,
    pub full_text: Option<String>,
    pub needed_search: bool,
    pub needed_full_text: bool,
}
