//! Report and section orchestration
//!
//! Per section: question generation, concurrent fan-out retrieval, then the
//! strictly sequential refine chain with the draft threading across
//! questions. Sections are processed one after another; each owns its draft.

use crate::structure::StructureAgent;
use crate::types::{ProgressEvent, ProgressReporter, ReportError, ReportResult};
use futures::future::join_all;
use reportify_core::{
    CompletionModel, GenerationConfig, Report, ReportifyConfig, SearchHit, Section,
};
use reportify_retrieval::{FetchOutcome, KnowledgeBase, RetrievalGateway};
use reportify_synthesis::{Draft, QuestionGenerator, RefineEngine};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Orchestrates full report generation
pub struct ReportGenerator {
    gateway: Arc<RetrievalGateway>,
    knowledge_base: KnowledgeBase,
    questions: QuestionGenerator,
    refine: RefineEngine,
    structure: StructureAgent,
    options: GenerationConfig,
    search_max_results: usize,
}

impl ReportGenerator {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        gateway: Arc<RetrievalGateway>,
        knowledge_base: KnowledgeBase,
        config: &ReportifyConfig,
    ) -> Self {
        Self {
            gateway,
            knowledge_base,
            questions: QuestionGenerator::new(Arc::clone(&model)),
            refine: RefineEngine::new(Arc::clone(&model)),
            structure: StructureAgent::new(model),
            options: config.generation.clone(),
            search_max_results: config.search.max_results,
        }
    }

    /// Generate a complete report for a topic.
    ///
    /// Sections are generated sequentially; cancellation is checked between
    /// sections and between questions, never mid model call.
    pub async fn generate_report(
        &self,
        topic: &str,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> ReportResult<Report> {
        info!("Generating report for topic: {}", topic);
        progress.emit(ProgressEvent::ReportStarted {
            topic: topic.to_string(),
        });

        let outline = self.structure.generate(topic).await;
        progress.emit(ProgressEvent::StructureReady {
            sections: outline.sections.clone(),
        });

        let mut sections = outline.sections;
        if let Some(max) = self.options.max_sections {
            sections.truncate(max);
        }

        let mut report = Report::new(topic);
        for section_title in sections {
            if cancel.is_cancelled() {
                return Err(ReportError::Cancelled(format!(
                    "before section '{}'",
                    section_title
                )));
            }

            let section = self
                .generate_section(topic, &section_title, progress, cancel)
                .await?;
            report.sections.push(section);

            progress.emit(ProgressEvent::SectionCompleted {
                section: section_title,
            });
        }

        progress.emit(ProgressEvent::ReportCompleted {
            topic: topic.to_string(),
        });
        info!(
            "Report for '{}' completed with {} sections",
            topic,
            report.sections.len()
        );
        Ok(report)
    }

    /// Generate one section: questions, fan-out search, sequential refine.
    ///
    /// The draft threads across questions: question n+1's refine receives
    /// question n's final draft. Questions whose search comes back empty are
    /// skipped with a notice, the draft carried forward unchanged.
    pub async fn generate_section(
        &self,
        topic: &str,
        section: &str,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> ReportResult<Section> {
        info!("Generating section '{}' for topic '{}'", section, topic);
        progress.emit(ProgressEvent::SectionStarted {
            section: section.to_string(),
        });

        let generated = self.questions.generate(topic, section).await;
        progress.emit(ProgressEvent::QuestionsGenerated {
            section: section.to_string(),
            questions: generated.questions.clone(),
            rationale: generated.rationale.clone(),
        });

        let mut questions = generated.questions;
        if let Some(max) = self.options.max_questions_per_section {
            questions.truncate(max);
        }

        if cancel.is_cancelled() {
            return Err(ReportError::Cancelled(format!(
                "before searching section '{}'",
                section
            )));
        }

        // Independent sub-question searches fan out concurrently; results
        // stay attributed to their question by position.
        for question in &questions {
            progress.emit(ProgressEvent::Searching {
                section: section.to_string(),
                question: question.clone(),
            });
        }
        let gathered = join_all(
            questions
                .iter()
                .map(|question| self.gather_for_question(question)),
        )
        .await;

        // The refine chain is strictly sequential and owns the one draft
        let mut draft: Option<Draft> = None;
        for (question, hits) in questions.iter().zip(gathered) {
            if cancel.is_cancelled() {
                return Err(ReportError::Cancelled(format!(
                    "while refining section '{}'",
                    section
                )));
            }

            progress.emit(ProgressEvent::SearchComplete {
                section: section.to_string(),
                question: question.clone(),
                hits: hits.len(),
            });

            if hits.is_empty() {
                progress.emit(ProgressEvent::Notice {
                    message: format!("未找到与问题「{}」相关的搜索结果", question),
                });
                continue;
            }

            let next = self.refine.refine(&hits, topic, section, draft.take()).await;
            progress.emit(ProgressEvent::DraftUpdated {
                section: section.to_string(),
                draft: next.as_str().to_string(),
            });
            draft = Some(next);
        }

        let content = match draft {
            Some(draft) => draft.into_inner(),
            None => reportify_synthesis::no_information_message(topic, section),
        };

        Ok(Section {
            title: section.to_string(),
            content,
        })
    }

    /// Search one question against web then knowledge base, fetch full text
    /// for the top web hits, and concatenate web results before
    /// knowledge-base results.
    async fn gather_for_question(&self, question: &str) -> Vec<SearchHit> {
        let mut web_hits = match self
            .gateway
            .search_web(question, self.search_max_results)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Web search failed for '{}': {}", question, e);
                Vec::new()
            }
        };

        // Full text for the top hits only; the rest stay snippet-only and
        // are skipped by the refine engine.
        for hit in web_hits.iter_mut().take(self.options.fetch_top_n) {
            if hit.url.is_empty() {
                continue;
            }
            match self.gateway.fetch_full_text(&hit.url).await {
                FetchOutcome::Extracted(text) => hit.full_text = Some(text),
                FetchOutcome::NothingExtractable => {
                    debug!("No extractable text at {}", hit.url);
                }
                FetchOutcome::Failed { reason } => {
                    warn!("Full-text fetch for {} failed: {}", hit.url, reason);
                }
            }
        }

        let kb_hits = match self
            .knowledge_base
            .search(question, self.options.knowledge_base_top_k)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Knowledge base search failed for '{}': {}", question, e);
                Vec::new()
            }
        };

        web_hits.extend(kb_hits);
        web_hits
    }
}
