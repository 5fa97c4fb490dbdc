//! Reportify Retrieval - Uniform retrieval gateway
//!
//! Wraps the heterogeneous information sources (web search tool, full-text
//! fetching, vector document store) behind one normalized `SearchHit` shape,
//! and provides document ingestion into the knowledge base.

pub mod gateway;
pub mod ingest;
pub mod store;
pub mod types;

pub use gateway::*;
pub use ingest::*;
pub use store::*;
pub use types::*;
