//! # promptmesh-core
//!
//! Core types, traits, and abstractions for the promptmesh workspace.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other promptmesh crates depend on: the error taxonomy, the domain
//! models (prompts, search results, relatedness edges, draft state, jobs),
//! the backend/repository trait seams, tunable defaults, and the structured
//! logging field schema.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::FeatureFlags;
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;

// Re-export the pgvector type used across crate boundaries
pub use pgvector::Vector;
