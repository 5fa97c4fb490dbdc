//! Refine-accumulate engine
//!
//! Folds an ordered sequence of retrieved documents into a running draft
//! through strictly sequential model calls: the first usable document seeds
//! the draft, every later one is folded in, and each call's response replaces
//! the draft wholesale. Call i+1 always receives the exact string call i
//! produced, so no two calls of one chain may ever be in flight together;
//! the `Draft` type enforces single ownership by being move-only.

use crate::prompts;
use crate::types::{Draft, SynthesisResult};
use reportify_core::{CompletionModel, SearchHit};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Fixed message when a refine round has nothing to work with
pub fn no_information_message(topic: &str, section: &str) -> String {
    format!("未找到关于「{} / {}」的相关信息。", topic, section)
}

/// Fixed message replacing a chain that died mid-flight
pub fn error_message(topic: &str, section: &str) -> String {
    format!("生成「{} / {}」内容时出错。", topic, section)
}

/// The refine-accumulate engine
pub struct RefineEngine {
    model: Arc<dyn CompletionModel>,
}

impl RefineEngine {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Fold `documents` into the draft, in presentation order.
    ///
    /// Documents without full text are skipped silently. A failure anywhere
    /// in the chain discards the partial accumulation and yields the fixed
    /// error message for this (topic, section) pair, all-or-nothing per
    /// invocation, and never an error to the caller.
    pub async fn refine(
        &self,
        documents: &[SearchHit],
        topic: &str,
        section: &str,
        existing: Option<Draft>,
    ) -> Draft {
        match self.refine_inner(documents, topic, section, existing).await {
            Ok(draft) => draft,
            Err(e) => {
                error!("Refine chain failed for {}/{}: {}", topic, section, e);
                Draft::new(error_message(topic, section))
            }
        }
    }

    async fn refine_inner(
        &self,
        documents: &[SearchHit],
        topic: &str,
        section: &str,
        existing: Option<Draft>,
    ) -> SynthesisResult<Draft> {
        let usable: Vec<&SearchHit> = documents.iter().filter(|d| d.has_full_text()).collect();

        let skipped = documents.len() - usable.len();
        if skipped > 0 {
            debug!(
                "Skipping {} of {} documents without full text for {}/{}",
                skipped,
                documents.len(),
                topic,
                section
            );
        }

        if usable.is_empty() {
            // Nothing to fold: an existing draft is carried forward untouched
            return Ok(match existing {
                Some(draft) => draft,
                None => Draft::new(no_information_message(topic, section)),
            });
        }

        // Strictly sequential: each call consumes the previous call's output.
        // Without an existing draft the first usable document seeds the chain.
        let count = usable.len();
        let mut draft: Option<Draft> = existing;
        for document in usable {
            let payload = document_payload(document);
            let response = match &draft {
                None => {
                    debug!(
                        "Seeding draft for {}/{} from {}",
                        topic,
                        section,
                        document.identity_key()
                    );
                    let prompt = prompts::initial_refine_prompt(topic, section, &payload);
                    self.model.complete(&prompt).await?
                }
                Some(current) => {
                    debug!(
                        "Folding {} into draft for {}/{}",
                        document.identity_key(),
                        topic,
                        section
                    );
                    let prompt =
                        prompts::refine_prompt(topic, section, current.as_str(), &payload);
                    self.model.complete(&prompt).await?
                }
            };
            draft = Some(Draft::new(response));
        }

        match draft {
            Some(draft) => {
                info!(
                    "Refined {} documents into draft for {}/{} ({} chars)",
                    count,
                    topic,
                    section,
                    draft.as_str().len()
                );
                Ok(draft)
            }
            // Unreachable: usable was checked non-empty above
            None => Ok(Draft::new(no_information_message(topic, section))),
        }
    }
}

/// Full text plus the url trailer that lets the model self-attribute sources
fn document_payload(hit: &SearchHit) -> String {
    let text = hit.full_text.as_deref().unwrap_or_default();
    format!("{}\nurl: {}", text, hit.identity_key())
}
