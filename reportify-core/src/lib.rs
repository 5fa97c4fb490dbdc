//! Reportify Core - Core data structures and trait definitions
//!
//! This module defines the shared abstractions and data structures for the
//! entire reportify system: retrieval records, report structures, the
//! completion-model and document-store collaborator contracts, plus the
//! error, logging and configuration layers used by every member crate.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
