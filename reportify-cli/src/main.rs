//! Reportify CLI - Command-line interface for reportify
//!
//! Generates research reports, answers ad-hoc questions with citations, and
//! manages the local knowledge base.

use anyhow::Context;
use clap::{Parser, Subcommand};
use reportify_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, performance,
    DocumentStore, LoggingConfig, ReportifyConfig,
};
use reportify_report::{ProgressEvent, ProgressReporter, ReportGenerator};
use reportify_retrieval::{
    DocType, DocumentIngestor, InMemoryStore, KnowledgeBase, RetrievalGateway,
};
use reportify_synthesis::{
    create_auto_client, ChatSearchPipeline, ReportifyLlmClient, SearchMode,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Parser)]
#[command(name = "reportify")]
#[command(about = "LLM-driven research report and answer generation")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a full research report for a topic
    Report {
        /// Report topic
        topic: String,

        /// Maximum questions processed per section
        #[arg(long)]
        max_questions: Option<usize>,

        /// Maximum sections to generate
        #[arg(long)]
        max_sections: Option<usize>,

        /// Write the report markdown to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ask a single question and get a cited answer
    Ask {
        /// The question
        question: String,

        /// Search mode: auto, web, or kb
        #[arg(long, default_value = "auto")]
        mode: String,
    },

    /// Ingest a document into the knowledge base
    Ingest {
        /// File path or URL
        location: String,

        /// Document type: pdf, docx, url or txt
        #[arg(long)]
        doc_type: String,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,

        /// Document summary
        #[arg(long)]
        summary: Option<String>,
    },

    /// List documents stored in the knowledge base
    Sources,

    /// Clear the knowledge base collection
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging_config = LoggingConfig::default();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }
    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config = match &cli.config {
        Some(path) => ReportifyConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ReportifyConfig::default(),
    };

    match cli.command {
        Commands::Report {
            topic,
            max_questions,
            max_sections,
            output,
        } => run_report(config, topic, max_questions, max_sections, output).await,
        Commands::Ask { question, mode } => run_ask(config, question, mode).await,
        Commands::Ingest {
            location,
            doc_type,
            title,
            notes,
            summary,
        } => run_ingest(config, location, doc_type, title, notes, summary).await,
        Commands::Sources => run_sources(config).await,
        Commands::Clear => run_clear(config).await,
    }
}

/// Build the LLM client from configuration, falling back to provider
/// auto-detection when the configured provider is unavailable.
async fn build_client(config: &ReportifyConfig) -> anyhow::Result<ReportifyLlmClient> {
    match ReportifyLlmClient::new(config.llm.clone()).await {
        Ok(client) => Ok(client),
        Err(e) => {
            warn!("Configured LLM provider unavailable ({}), auto-detecting", e);
            create_auto_client()
                .await
                .context("No usable LLM provider found")
        }
    }
}

fn build_store(config: &ReportifyConfig) -> Arc<dyn DocumentStore> {
    // The persistent vector store is wired externally; the in-memory store
    // keeps every command runnable without one. The configured location is
    // what an external store implementation receives.
    tracing::debug!(
        persist_dir = %config.store.persist_dir.display(),
        collection = %config.store.collection,
        "Using in-memory document store"
    );
    Arc::new(InMemoryStore::new())
}

async fn run_report(
    config: ReportifyConfig,
    topic: String,
    max_questions: Option<usize>,
    max_sections: Option<usize>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    log_operation_start!("report", topic = %topic);

    let mut config = config;
    if max_questions.is_some() {
        config.generation.max_questions_per_section = max_questions;
    }
    if max_sections.is_some() {
        config.generation.max_sections = max_sections;
    }

    let client = Arc::new(build_client(&config).await?);
    println!("🤖 Model: {}", client.model_info().summary());

    let gateway = Arc::new(RetrievalGateway::from_config(config.search.clone())?);
    let knowledge_base = KnowledgeBase::new(build_store(&config));
    let generator = ReportGenerator::new(client, gateway, knowledge_base, &config);

    let cancel = CancellationToken::new();
    let cancel_on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n⏹  Cancelling after the current step...");
            cancel_on_ctrl_c.cancel();
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let result = performance::measure_async(
        "generate_report",
        generator.generate_report(&topic, &ProgressReporter::new(tx), &cancel),
    )
    .await;
    let _ = printer.await;

    match result {
        Ok(report) => {
            let markdown = report.to_markdown();
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &markdown).await?;
                    println!("📄 Report written to {}", path.display());
                }
                None => println!("\n{}", markdown),
            }
            log_operation_success!("report", sections = report.sections.len());
            Ok(())
        }
        Err(e) => {
            log_operation_error!("report", e);
            Err(e.into())
        }
    }
}

fn print_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::ReportStarted { topic } => println!("📋 开始生成报告：{}", topic),
        ProgressEvent::StructureReady { sections } => {
            println!("🧭 报告结构已生成：");
            for (i, section) in sections.iter().enumerate() {
                println!("  {}. {}", i + 1, section);
            }
        }
        ProgressEvent::SectionStarted { section } => println!("\n📝 开始生成章节：{}", section),
        ProgressEvent::QuestionsGenerated {
            section, questions, ..
        } => {
            println!("❓ 为章节「{}」生成的检索问题：", section);
            for (i, question) in questions.iter().enumerate() {
                println!("  {}. {}", i + 1, question);
            }
        }
        ProgressEvent::Searching { question, .. } => println!("🔍 正在搜索：{}", question),
        ProgressEvent::SearchComplete { question, hits, .. } => {
            println!("✅ 「{}」找到 {} 条相关结果", question, hits)
        }
        ProgressEvent::Notice { message } => println!("⚠️  {}", message),
        ProgressEvent::DraftUpdated { section, draft } => {
            println!("✍️  章节「{}」草稿已更新（{} 字符）", section, draft.chars().count())
        }
        ProgressEvent::SectionCompleted { section } => println!("📦 章节「{}」生成完成", section),
        ProgressEvent::ReportCompleted { .. } => println!("\n🎉 报告生成完成！"),
    }
}

async fn run_ask(config: ReportifyConfig, question: String, mode: String) -> anyhow::Result<()> {
    log_operation_start!("ask", question = %question);

    let mode = SearchMode::from_str(&mode)?;
    let client = Arc::new(build_client(&config).await?);
    let gateway = Arc::new(RetrievalGateway::from_config(config.search.clone())?);
    let knowledge_base = KnowledgeBase::new(build_store(&config));

    let pipeline = ChatSearchPipeline::new(client, gateway, knowledge_base, &config);
    let answer = pipeline.process_query(&question, mode).await?;

    println!("\n{}", answer.answer);
    if !answer.citation.is_empty() {
        println!("{}", answer.citation);
    }
    if answer.needed_search {
        println!(
            "\n(网络搜索: {} 条结果, 知识库: {} 条结果{})",
            answer.search_results.len(),
            answer.knowledge_base_results.len(),
            if answer.needed_full_text {
                ", 已获取全文"
            } else {
                ""
            }
        );
    }

    log_operation_success!("ask");
    Ok(())
}

async fn run_ingest(
    config: ReportifyConfig,
    location: String,
    doc_type: String,
    title: Option<String>,
    notes: Option<String>,
    summary: Option<String>,
) -> anyhow::Result<()> {
    log_operation_start!("ingest", location = %location);

    let doc_type = DocType::from_str(&doc_type)?;
    let store = build_store(&config);
    let gateway = Arc::new(RetrievalGateway::from_config(config.search.clone())?);
    let ingestor = DocumentIngestor::new(store, gateway, config.ingest.clone());

    let chunks = ingestor
        .process_document(
            &location,
            doc_type,
            title.as_deref(),
            notes.as_deref(),
            summary.as_deref(),
        )
        .await?;

    println!("📥 已入库 {} 个文档分块", chunks);
    log_operation_success!("ingest", chunks = chunks);
    Ok(())
}

async fn run_sources(config: ReportifyConfig) -> anyhow::Result<()> {
    let store = build_store(&config);
    let documents = store.get_all().await?;

    if documents.is_empty() {
        println!("知识库为空。");
        return Ok(());
    }

    println!("知识库共 {} 个分块：", documents.len());
    for doc in documents {
        let title = doc.metadata.get("title").map(|s| s.as_str()).unwrap_or("未知");
        let source = doc.metadata.get("source").map(|s| s.as_str()).unwrap_or("未知");
        println!("  [{}] {} ({})", doc.id, title, source);
    }
    Ok(())
}

async fn run_clear(config: ReportifyConfig) -> anyhow::Result<()> {
    let store = build_store(&config);
    store.delete_collection().await?;
    println!("🗑  知识库已清空。");
    Ok(())
}
