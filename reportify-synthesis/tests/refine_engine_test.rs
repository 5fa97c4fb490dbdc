//! Integration tests for the refine-accumulate engine and question generator,
//! driven by scripted completion-model doubles.

use reportify_core::{async_trait, CompletionModel, ReportifyError, ReportifyResult, SearchHit};
use reportify_synthesis::{
    error_message, fallback_questions, no_information_message, Draft, ParseOutcome,
    QuestionGenerator, RefineEngine,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Oracle returning scripted responses in order, recording every prompt.
/// Runs out of script -> errors, which doubles as a failure injector.
struct ScriptedOracle {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionModel for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> ReportifyResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ReportifyError::Llm {
                message: "scripted failure".to_string(),
                provider: None,
                model: None,
                context: reportify_core::ErrorContext::new("scripted_oracle"),
            })
    }
}

fn doc(url: &str, text: Option<&str>) -> SearchHit {
    let mut hit = SearchHit::web(format!("doc {}", url), url, "snippet");
    hit.full_text = text.map(|t| t.to_string());
    hit
}

#[tokio::test]
async fn test_fallback_determinism_when_model_fails() {
    let oracle = ScriptedOracle::new(&[]);
    let generator = QuestionGenerator::new(oracle.clone());

    let first = generator.generate("量子计算技术动态", "政策和战略").await;
    let second = generator.generate("量子计算技术动态", "政策和战略").await;

    let expected = fallback_questions("量子计算技术动态", "政策和战略");
    assert_eq!(first.questions, expected);
    assert_eq!(second.questions, expected);
    assert_eq!(first.questions.len(), 4);
    assert!(first.rationale.is_empty());
    assert_eq!(first.outcome, ParseOutcome::Fallback);
}

#[tokio::test]
async fn test_questions_parsed_from_markers() {
    let response = "前置噪音\n<|think_start|>政策章节需要官方文件<|think_end|>\n\
        <|question_start|>量子计算 政策 文件<|question_end|>\n\
        <|question_start|>量子计算 政策 资金<|question_end|>\n\
        <|question_start|>量子计算 政策 战略<|question_end|>\n尾部噪音";
    let oracle = ScriptedOracle::new(&[response]);
    let generator = QuestionGenerator::new(oracle.clone());

    let generated = generator.generate("量子计算", "政策").await;

    assert_eq!(generated.outcome, ParseOutcome::Parsed);
    assert_eq!(generated.questions.len(), 3);
    assert_eq!(generated.questions[0], "量子计算 政策 文件");
    assert_eq!(generated.rationale, vec!["政策章节需要官方文件".to_string()]);
}

#[tokio::test]
async fn test_too_few_parsed_questions_padded_with_fallbacks() {
    let response = "<|question_start|>唯一的问题<|question_end|>";
    let oracle = ScriptedOracle::new(&[response]);
    let generator = QuestionGenerator::new(oracle.clone());

    let generated = generator.generate("主题", "章节").await;

    assert_eq!(generated.outcome, ParseOutcome::Parsed);
    assert_eq!(generated.questions.len(), 5);
    assert_eq!(generated.questions[0], "唯一的问题");
    assert_eq!(generated.questions[1], "主题 章节 概述");
}

#[tokio::test]
async fn test_excess_questions_truncated_to_five() {
    let response: String = (0..8)
        .map(|i| format!("<|question_start|>问题{}<|question_end|>\n", i))
        .collect();
    let oracle = ScriptedOracle::new(&[response.as_str()]);
    let generator = QuestionGenerator::new(oracle.clone());

    let generated = generator.generate("主题", "章节").await;
    assert_eq!(generated.questions.len(), 5);
    assert_eq!(generated.questions[4], "问题4");
}

#[tokio::test]
async fn test_refine_threads_previous_output_verbatim() {
    let oracle = ScriptedOracle::new(&["draft one", "draft two", "draft three"]);
    let engine = RefineEngine::new(oracle.clone());

    let documents = vec![
        doc("https://a.com", Some("text of document one")),
        doc("https://b.com", Some("text of document two")),
        doc("https://c.com", Some("text of document three")),
    ];

    let draft = engine.refine(&documents, "topic", "section", None).await;

    assert_eq!(draft.as_str(), "draft three");
    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 3);

    // Seed prompt carries the first document and no draft
    assert!(prompts[0].contains("text of document one"));
    assert!(prompts[0].contains("url: https://a.com"));
    assert!(!prompts[0].contains("draft one"));

    // Each fold prompt carries the previous call's exact output
    assert!(prompts[1].contains("draft one"));
    assert!(prompts[1].contains("text of document two"));
    assert!(prompts[2].contains("draft two"));
    assert!(prompts[2].contains("text of document three"));
}

#[tokio::test]
async fn test_document_without_text_skipped_without_disruption() {
    let with_gap = vec![
        doc("https://a.com", Some("first text")),
        doc("https://gap.com", None),
        doc("https://c.com", Some("second text")),
    ];
    let without_gap = vec![
        doc("https://a.com", Some("first text")),
        doc("https://c.com", Some("second text")),
    ];

    let oracle_a = ScriptedOracle::new(&["seeded", "folded"]);
    let engine_a = RefineEngine::new(oracle_a.clone());
    let draft_a = engine_a.refine(&with_gap, "topic", "section", None).await;

    let oracle_b = ScriptedOracle::new(&["seeded", "folded"]);
    let engine_b = RefineEngine::new(oracle_b.clone());
    let draft_b = engine_b.refine(&without_gap, "topic", "section", None).await;

    assert_eq!(draft_a.as_str(), draft_b.as_str());
    assert_eq!(oracle_a.prompts(), oracle_b.prompts());
    assert_eq!(oracle_a.call_count(), 2);
}

#[tokio::test]
async fn test_empty_documents_shortcut_issues_no_calls() {
    let oracle = ScriptedOracle::new(&["should never be used"]);
    let engine = RefineEngine::new(oracle.clone());

    let draft = engine.refine(&[], "量子计算", "政策", None).await;

    assert_eq!(draft.as_str(), no_information_message("量子计算", "政策"));
    assert_eq!(oracle.call_count(), 0);
}

#[tokio::test]
async fn test_existing_draft_carried_forward_on_empty_documents() {
    let oracle = ScriptedOracle::new(&[]);
    let engine = RefineEngine::new(oracle.clone());

    let existing = Draft::new("已有草稿");
    let draft = engine
        .refine(&[], "量子计算", "政策", Some(existing))
        .await;

    assert_eq!(draft.as_str(), "已有草稿");
    assert_eq!(oracle.call_count(), 0);
}

#[tokio::test]
async fn test_existing_draft_means_every_document_is_folded() {
    let oracle = ScriptedOracle::new(&["next draft"]);
    let engine = RefineEngine::new(oracle.clone());

    let documents = vec![doc("https://a.com", Some("new material"))];
    let draft = engine
        .refine(&documents, "topic", "section", Some(Draft::new("prior draft")))
        .await;

    assert_eq!(draft.as_str(), "next draft");
    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 1);
    // A fold, not a seed: the prior draft appears in the prompt
    assert!(prompts[0].contains("prior draft"));
}

#[tokio::test]
async fn test_chain_failure_discards_partial_accumulation() {
    // One scripted response, two documents: the second call fails
    let oracle = ScriptedOracle::new(&["partial draft"]);
    let engine = RefineEngine::new(oracle.clone());

    let documents = vec![
        doc("https://a.com", Some("first")),
        doc("https://b.com", Some("second")),
    ];

    let draft = engine.refine(&documents, "量子计算", "政策", None).await;

    assert_eq!(oracle.call_count(), 2);
    // The partial draft is gone, replaced by the fixed error message
    assert_eq!(draft.as_str(), error_message("量子计算", "政策"));
}
