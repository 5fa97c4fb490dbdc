//! Type definitions for the retrieval layer

use reportify_core::ReportifyError;

/// Error types for retrieval operations
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Search error: {0}")]
    Search(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Unsupported document type: {0}")]
    UnsupportedDocType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(Box<ReportifyError>),
}

impl From<ReportifyError> for RetrievalError {
    fn from(err: ReportifyError) -> Self {
        RetrievalError::Core(Box::new(err))
    }
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// Outcome of a full-text fetch.
///
/// Transport and extraction failures are ordinary values here, not errors:
/// the caller decides whether a failed fetch aborts anything. Downstream code
/// never has to sniff error prose out of content strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Visible text extracted from the page body
    Extracted(String),
    /// The page was fetched but contained no extractable text
    NothingExtractable,
    /// Network failure, timeout, or non-success status
    Failed { reason: String },
}

impl FetchOutcome {
    /// The extracted text, if this outcome carries usable content
    pub fn text(&self) -> Option<&str> {
        match self {
            FetchOutcome::Extracted(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, FetchOutcome::Extracted(_))
    }
}
