//! Chat answer path
//!
//! The short variant of the pipeline: one query, a model-decided (or forced)
//! web search, an optional full-text fetch of the top hit, a knowledge-base
//! lookup, one synthesis call, and citation reconciliation.

use crate::citations::CitationReconciler;
use crate::prompts;
use crate::types::{ChatAnswer, SearchMode, SynthesisResult};
use reportify_core::{CompletionModel, ReportifyConfig, SearchHit, Source};
use reportify_retrieval::{FetchOutcome, KnowledgeBase, RetrievalGateway};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Affirmative answer expected from the yes/no decision prompts
const YES: &str = "是";

/// Chat pipeline over the retrieval gateway and knowledge base
pub struct ChatSearchPipeline {
    model: Arc<dyn CompletionModel>,
    gateway: Arc<RetrievalGateway>,
    knowledge_base: KnowledgeBase,
    reconciler: CitationReconciler,
    max_results: usize,
    knowledge_base_top_k: usize,
}

impl ChatSearchPipeline {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        gateway: Arc<RetrievalGateway>,
        knowledge_base: KnowledgeBase,
        config: &ReportifyConfig,
    ) -> Self {
        let reconciler = CitationReconciler::new(Arc::clone(&model));
        Self {
            model,
            gateway,
            knowledge_base,
            reconciler,
            max_results: config.search.max_results,
            knowledge_base_top_k: config.generation.knowledge_base_top_k,
        }
    }

    /// Process one user query into a cited answer
    pub async fn process_query(
        &self,
        query: &str,
        mode: SearchMode,
    ) -> SynthesisResult<ChatAnswer> {
        info!("Processing chat query ({:?}): {}", mode, query);

        let needed_search = match mode {
            SearchMode::Web => true,
            SearchMode::KnowledgeBase => false,
            SearchMode::Auto => {
                let decision = self
                    .model
                    .complete(&prompts::need_search_prompt(query))
                    .await?;
                decision.trim() == YES
            }
        };

        let mut search_results: Vec<SearchHit> = Vec::new();
        let mut full_text: Option<String> = None;
        let mut needed_full_text = false;

        if needed_search {
            search_results = match self.gateway.search_web(query, self.max_results).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Web search failed for chat query: {}", e);
                    Vec::new()
                }
            };

            if !search_results.is_empty() {
                let summary = format_search_results(&search_results);
                let decision = self
                    .model
                    .complete(&prompts::need_full_text_prompt(query, &summary))
                    .await?;
                needed_full_text = decision.trim() == YES;

                // Full text is fetched for the first hit only
                if needed_full_text {
                    let first_url = &search_results[0].url;
                    if !first_url.is_empty() {
                        match self.gateway.fetch_full_text(first_url).await {
                            FetchOutcome::Extracted(text) => full_text = Some(text),
                            FetchOutcome::NothingExtractable => {
                                debug!("No extractable text at top hit {}", first_url);
                            }
                            FetchOutcome::Failed { reason } => {
                                warn!("Top-hit full-text fetch failed: {}", reason);
                            }
                        }
                    }
                }
            }
        }

        let knowledge_base_results = match self
            .knowledge_base
            .search(query, self.knowledge_base_top_k)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Knowledge base search failed: {}", e);
                Vec::new()
            }
        };

        let answer = self
            .model
            .complete(&prompts::final_answer_prompt(
                query,
                &format_search_results(&search_results),
                &format_knowledge_base_results(&knowledge_base_results),
                full_text.as_deref().unwrap_or_default(),
            ))
            .await?;

        // Web sources first, then knowledge base, deduplicated downstream
        let sources: Vec<Source> = search_results
            .iter()
            .chain(knowledge_base_results.iter())
            .map(Source::from_hit)
            .collect();

        let reconciled = self.reconciler.reconcile(&answer, &sources).await;

        Ok(ChatAnswer {
            query: query.to_string(),
            answer: reconciled.final_answer,
            citation: reconciled.citation_block,
            search_results,
            knowledge_base_results,
            full_text,
            needed_search,
            needed_full_text,
        })
    }
}

/// Format web results for the decision and synthesis prompts
pub fn format_search_results(results: &[SearchHit]) -> String {
    if results.is_empty() {
        return "没有找到相关搜索结果。".to_string();
    }

    let mut formatted = String::new();
    for (i, result) in results.iter().enumerate() {
        formatted.push_str(&format!("结果 {}:\n", i + 1));
        formatted.push_str(&format!("标题: {}\n", result.title));
        formatted.push_str(&format!("摘要: {}\n", result.snippet));
        formatted.push_str(&format!("URL: {}\n\n", result.url));
    }
    formatted
}

/// Format knowledge-base results for the synthesis prompt
pub fn format_knowledge_base_results(results: &[SearchHit]) -> String {
    if results.is_empty() {
        return "知识库中没有找到相关信息。".to_string();
    }

    let mut formatted = String::new();
    for (i, result) in results.iter().enumerate() {
        formatted.push_str(&format!("知识库结果 {}:\n", i + 1));
        formatted.push_str(&format!("标题: {}\n", result.title));
        formatted.push_str(&format!("内容: {}\n", result.snippet));
        formatted.push_str(&format!("来源: {}\n\n", result.identity_key()));
    }
    formatted
}
