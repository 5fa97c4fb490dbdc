//! Reportify Synthesis - LLM-driven content generation
//!
//! This module integrates with siumai to provide the generation half of the
//! reportify pipeline: sub-question generation, the refine-accumulate engine
//! that folds retrieved documents into a running draft, citation
//! reconciliation, and the chat answer path.

pub mod chat;
pub mod citations;
pub mod llm_client;
pub mod prompts;
pub mod questions;
pub mod refine;
pub mod types;

pub use chat::*;
pub use citations::*;
pub use llm_client::*;
pub use questions::*;
pub use refine::*;
pub use types::*;

// Re-export commonly used types from siumai
pub use siumai::prelude::LlmClient;
