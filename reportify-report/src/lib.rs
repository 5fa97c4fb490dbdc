//! Reportify Report - Report orchestration
//!
//! Drives the full pipeline: structure generation, per-section question
//! generation, fan-out retrieval, the sequential refine chain, and report
//! assembly, with incremental progress events and cooperative cancellation.

pub mod generator;
pub mod structure;
pub mod types;

pub use generator::*;
pub use structure::*;
pub use types::*;
