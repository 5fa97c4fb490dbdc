//! Citation reconciliation
//!
//! Post-processes a finished answer plus its deduplicated source list into an
//! answer with inline numbered markers and a matching reference list, via one
//! model call with strict format contracts. Parsing misses degrade silently;
//! marker consistency is checked but never enforced.

use crate::prompts::{self, CITATION_HEADER};
use crate::types::{Reconciled, SynthesisError, SynthesisResult};
use regex::Regex;
use reportify_core::{CompletionModel, Source};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Deduplicate sources by url, preserving first-seen order
pub fn dedup_sources(sources: &[Source]) -> Vec<Source> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for source in sources {
        if !source.url.is_empty() && seen.insert(source.url.clone()) {
            unique.push(source.clone());
        }
    }

    unique
}

/// Split reconciler output into (answer, citation block).
///
/// Splits on the first occurrence of the citation header preceded by one
/// newline, then the two-newline variant; when neither is present the whole
/// text is the answer and the block is empty.
pub fn split_citation(text: &str) -> (String, String) {
    let primary = format!("\n{}", CITATION_HEADER);
    if let Some((answer, rest)) = text.split_once(&primary) {
        return (
            answer.trim().to_string(),
            format!("\n{}{}", CITATION_HEADER, rest),
        );
    }

    let fallback = format!("\n\n{}", CITATION_HEADER);
    if let Some((answer, rest)) = text.split_once(&fallback) {
        return (
            answer.trim().to_string(),
            format!("\n{}{}", CITATION_HEADER, rest),
        );
    }

    (text.to_string(), String::new())
}

/// Best-effort check that inline `[n]` markers and numbered entries agree.
///
/// Returns false (and the caller logs) on any marker without an entry or
/// entry without a marker; consistency is requested of the model, not
/// enforced here.
pub fn markers_consistent(answer: &str, citation_block: &str) -> SynthesisResult<bool> {
    let marker_re = Regex::new(r"\[(\d+)\]")
        .map_err(|e| SynthesisError::Parse(format!("Invalid marker pattern: {}", e)))?;

    let markers: HashSet<u32> = marker_re
        .captures_iter(answer)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    let entries: HashSet<u32> = citation_block
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            marker_re
                .captures(line)
                .filter(|caps| {
                    caps.get(0)
                        .map(|m| m.start() == 0)
                        .unwrap_or(false)
                })
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
        .collect();

    Ok(markers == entries)
}

/// Reconciles answers with their citation lists
pub struct CitationReconciler {
    model: Arc<dyn CompletionModel>,
}

impl CitationReconciler {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Produce a marker-augmented answer and a matching reference list.
    ///
    /// Model failure or a missing header degrades to the original answer
    /// with an empty citation block; the caller never sees an error.
    pub async fn reconcile(&self, answer: &str, sources: &[Source]) -> Reconciled {
        let unique = dedup_sources(sources);
        if unique.is_empty() {
            debug!("No citation sources, skipping reconciliation");
            return Reconciled {
                final_answer: answer.to_string(),
                citation_block: String::new(),
            };
        }

        let formatted = prompts::format_sources(&unique);
        let prompt = prompts::citation_prompt(answer, &formatted);

        let response = match self.model.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Citation reconciliation failed: {}, keeping original answer", e);
                return Reconciled {
                    final_answer: answer.to_string(),
                    citation_block: String::new(),
                };
            }
        };

        let (final_answer, citation_block) = split_citation(&response);

        if citation_block.is_empty() {
            warn!("No citation header in reconciler output, treating whole text as answer");
        } else {
            match markers_consistent(&final_answer, &citation_block) {
                Ok(true) => {}
                Ok(false) => warn!("Inline markers and reference entries do not match"),
                Err(e) => warn!("Marker verification skipped: {}", e),
            }
        }

        info!(
            "Reconciled citations: {} sources, {} chars of references",
            unique.len(),
            citation_block.len()
        );

        Reconciled {
            final_answer,
            citation_block,
        }
    }
}
