//! End-to-end report generation tests with scripted collaborators: a fixed
//! search tool, a loopback HTTP server for full-text fetches, an empty
//! in-memory knowledge base, and a scripted completion model.

use reportify_core::{
    async_trait, CompletionModel, DocumentStore, ReportifyConfig, ReportifyError,
    ReportifyResult,
};
use reportify_report::{ProgressEvent, ProgressReporter, ReportError, ReportGenerator};
use reportify_retrieval::{
    InMemoryStore, KnowledgeBase, RetrievalGateway, RetrievalResult, SearchTool,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

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

struct FixedTool(String);

#[async_trait]
impl SearchTool for FixedTool {
    async fn run(&self, _query: &str) -> RetrievalResult<String> {
        Ok(self.0.clone())
    }
}

/// Minimal loopback HTTP server returning one fixed HTML page
async fn spawn_html_server(paragraph: &str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let html = format!("<html><body><p>{}</p></body></html>", paragraph);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let html = html.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    html.len(),
                    html
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

fn test_config(max_questions: Option<usize>, max_sections: Option<usize>) -> ReportifyConfig {
    let mut config = ReportifyConfig::default();
    config.generation.max_questions_per_section = max_questions;
    config.generation.max_sections = max_sections;
    config.generation.fetch_top_n = 1;
    config.generation.knowledge_base_top_k = 3;
    config.search.max_results = 5;
    config
}

fn build_generator(
    oracle: Arc<ScriptedOracle>,
    search_block: String,
    config: &ReportifyConfig,
) -> ReportGenerator {
    let gateway = Arc::new(
        RetrievalGateway::new(Arc::new(FixedTool(search_block)), config.search.clone()).unwrap(),
    );
    let store = Arc::new(InMemoryStore::new()) as Arc<dyn DocumentStore>;
    ReportGenerator::new(oracle, gateway, KnowledgeBase::new(store), config)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_section_two_questions_two_refine_calls() {
    let server = spawn_html_server("量子计算政策原文内容。").await;
    let search_block = format!(
        "标题: 政策文章\n链接: {}/article\n摘要: 政策摘要\n---\n",
        server
    );

    let oracle = ScriptedOracle::new(&[
        "<|question_start|>quantum computing policy overview<|question_end|>\n\
         <|question_start|>quantum computing policy funding<|question_end|>\n\
         <|question_start|>quantum computing policy strategy<|question_end|>",
        "seed draft",
        "final draft",
        "third draft",
    ]);

    let config = test_config(None, None);
    let generator = build_generator(oracle.clone(), search_block, &config);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let section = generator
        .generate_section(
            "quantum computing",
            "policy",
            &ProgressReporter::new(tx),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // 1 question call + 3 refine calls (seed + two folds)
    assert_eq!(oracle.call_count(), 4);
    assert_eq!(section.title, "policy");
    assert_eq!(section.content, "third draft");

    let events = drain(&mut rx);
    let draft_updates = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::DraftUpdated { .. }))
        .count();
    assert_eq!(draft_updates, 3);
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::QuestionsGenerated { questions, .. } if questions.len() == 3)));
}

#[tokio::test]
async fn test_question_cap_bounds_refine_calls() {
    let server = spawn_html_server("政策原文。").await;
    let search_block = format!("标题: 文章\n链接: {}/a\n摘要: 摘要\n---\n", server);

    // Question generation falls back to 4 questions; the cap keeps 2,
    // so exactly 2 refine calls happen (seed + one fold).
    let oracle = ScriptedOracle::new(&["ignored", "seed draft", "final draft"]);
    let config = test_config(Some(2), None);
    let generator = build_generator(oracle.clone(), search_block, &config);

    let section = generator
        .generate_section(
            "quantum computing",
            "policy",
            &ProgressReporter::disabled(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // 1 question call (unparseable -> fallback) + 2 refine calls
    assert_eq!(oracle.call_count(), 3);
    assert_eq!(section.content, "final draft");
}

#[tokio::test]
async fn test_full_report_with_limits() {
    let server = spawn_html_server("行业概述原文。").await;
    let search_block = format!("标题: 概述\n链接: {}/a\n摘要: 摘要\n---\n", server);

    let oracle = ScriptedOracle::new(&[
        r#"{"structure": [{"subtitle": "概述"}, {"subtitle": "政策"}, {"subtitle": "趋势"}]}"#,
        "<|question_start|>新能源 概述 现状<|question_end|>\n\
         <|question_start|>新能源 概述 数据<|question_end|>\n\
         <|question_start|>新能源 概述 企业<|question_end|>",
        "section draft",
    ]);

    // One section, one question per section
    let config = test_config(Some(1), Some(1));
    let generator = build_generator(oracle.clone(), search_block, &config);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let report = generator
        .generate_report(
            "新能源汽车产业动态",
            &ProgressReporter::new(tx),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // structure + questions + single refine
    assert_eq!(oracle.call_count(), 3);
    assert_eq!(report.sections.len(), 1);
    assert_eq!(report.sections[0].title, "概述");
    assert_eq!(report.sections[0].content, "section draft");

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::StructureReady { sections } if sections.len() == 3)));
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::ReportCompleted { .. })));
}

#[tokio::test]
async fn test_empty_search_skips_question_with_notice() {
    // Search tool finds nothing; the question generator falls back too
    let oracle = ScriptedOracle::new(&[]);
    let config = test_config(Some(1), None);
    let generator = build_generator(oracle.clone(), String::new(), &config);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let section = generator
        .generate_section(
            "量子计算",
            "政策",
            &ProgressReporter::new(tx),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        section.content,
        reportify_synthesis::no_information_message("量子计算", "政策")
    );

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::Notice { .. })));
}

#[tokio::test]
async fn test_cancellation_between_steps() {
    let oracle = ScriptedOracle::new(&[]);
    let config = test_config(Some(1), None);
    let generator = build_generator(oracle.clone(), String::new(), &config);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = generator
        .generate_report("量子计算", &ProgressReporter::disabled(), &cancel)
        .await;

    assert!(matches!(result, Err(ReportError::Cancelled(_))));
}

#[tokio::test]
async fn test_structure_fallback_on_model_failure() {
    let oracle = ScriptedOracle::new(&[]);
    let agent = reportify_report::StructureAgent::new(oracle.clone());

    let outline = agent.generate("量子计算").await;
    assert_eq!(outline.sections, reportify_report::fallback_structure());
    assert_eq!(outline.outcome, reportify_synthesis::ParseOutcome::Fallback);
}
