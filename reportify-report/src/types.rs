//! Type definitions for report orchestration

use reportify_core::ReportifyError;
use reportify_retrieval::RetrievalError;
use reportify_synthesis::SynthesisError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Error types for report orchestration
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Structure error: {0}")]
    Structure(String),

    #[error("Generation cancelled at stage: {0}")]
    Cancelled(String),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Core error: {0}")]
    Core(Box<ReportifyError>),
}

impl From<ReportifyError> for ReportError {
    fn from(err: ReportifyError) -> Self {
        ReportError::Core(Box::new(err))
    }
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Observable step of report generation.
///
/// Every major step is an event, not just the final return value, so callers
/// can surface incremental progress instead of blocking silently across
/// multi-second model and network calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgressEvent {
    ReportStarted {
        topic: String,
    },
    StructureReady {
        sections: Vec<String>,
    },
    SectionStarted {
        section: String,
    },
    QuestionsGenerated {
        section: String,
        questions: Vec<String>,
        rationale: Vec<String>,
    },
    Searching {
        section: String,
        question: String,
    },
    SearchComplete {
        section: String,
        question: String,
        hits: usize,
    },
    /// Human-readable notice about a skipped unit of work
    Notice {
        message: String,
    },
    DraftUpdated {
        section: String,
        draft: String,
    },
    SectionCompleted {
        section: String,
    },
    ReportCompleted {
        topic: String,
    },
}

/// Progress sink. Dropping the receiver silently disables reporting.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// No-op reporter for callers that only want the final value
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                debug!("Progress receiver dropped, event discarded");
            }
        }
    }
}
