//! Retrieval question generation
//!
//! One model call per (topic, section) pair produces delimited thinking and
//! question segments; everything else is deterministic fallback. This
//! component never surfaces an error to its caller.

use crate::prompts;
use crate::types::{GeneratedQuestions, ParseOutcome, SynthesisError, SynthesisResult};
use regex::Regex;
use reportify_core::CompletionModel;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MIN_QUESTIONS: usize = 3;
const MAX_QUESTIONS: usize = 5;

/// Deterministic fallback questions for a (topic, section) pair
pub fn fallback_questions(topic: &str, section: &str) -> Vec<String> {
    vec![
        format!("{} {} 概述", topic, section),
        format!("{} {} 关键点", topic, section),
        format!("{} {} 最新研究", topic, section),
        format!("{} {} 数据统计", topic, section),
    ]
}

/// Generates retrieval sub-questions for one report section
pub struct QuestionGenerator {
    model: Arc<dyn CompletionModel>,
}

impl QuestionGenerator {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Generate 3-5 ordered retrieval questions.
    ///
    /// Any failure in the model call or parsing collapses to the fixed
    /// fallback set with an empty rationale (fatal-to-partial).
    pub async fn generate(&self, topic: &str, section: &str) -> GeneratedQuestions {
        match self.generate_inner(topic, section).await {
            Ok(generated) => generated,
            Err(e) => {
                warn!(
                    "Question generation failed for {}/{}: {}, using fallback",
                    topic, section, e
                );
                GeneratedQuestions {
                    questions: fallback_questions(topic, section),
                    rationale: Vec::new(),
                    outcome: ParseOutcome::Fallback,
                }
            }
        }
    }

    async fn generate_inner(
        &self,
        topic: &str,
        section: &str,
    ) -> SynthesisResult<GeneratedQuestions> {
        let prompt = prompts::question_prompt(topic, section);
        let response = self.model.complete(&prompt).await?;

        let rationale = extract_segments(
            &response,
            prompts::THINK_START,
            prompts::THINK_END,
        )?;
        let mut questions = extract_segments(
            &response,
            prompts::QUESTION_START,
            prompts::QUESTION_END,
        )?;

        for thought in &rationale {
            debug!("Question generation thinking: {}", thought);
        }

        if questions.is_empty() {
            return Err(SynthesisError::Parse(
                "No question markers found in model response".to_string(),
            ));
        }

        // Pad with deterministic fallbacks up to the minimum
        if questions.len() < MIN_QUESTIONS {
            let defaults = fallback_questions(topic, section);
            let missing = MAX_QUESTIONS - questions.len();
            questions.extend(defaults.into_iter().take(missing));
        }
        questions.truncate(MAX_QUESTIONS);

        info!(
            "Generated {} questions for {}/{}",
            questions.len(),
            topic,
            section
        );

        Ok(GeneratedQuestions {
            questions,
            rationale,
            outcome: ParseOutcome::Parsed,
        })
    }
}

/// Extract all segments enclosed by a start/end marker pair, non-greedy,
/// across multiline content. Text outside markers is ignored.
fn extract_segments(text: &str, start: &str, end: &str) -> SynthesisResult<Vec<String>> {
    let pattern = format!(
        "(?s){}(.*?){}",
        regex::escape(start),
        regex::escape(end)
    );
    let re = Regex::new(&pattern)
        .map_err(|e| SynthesisError::Parse(format!("Invalid marker pattern: {}", e)))?;

    Ok(re
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
