//! Semantic search, query expansion, retrieval-augmented improvement, and
//! relatedness indexing for the prompt library.

pub mod classifier;
pub mod expander;
pub mod improve;
pub mod quality;
pub mod relatedness;
pub mod semantic;

pub use classifier::is_natural_language;
pub use expander::QueryExpander;
pub use improve::ImprovementService;
pub use quality::QualityChecker;
pub use relatedness::{OnEmpty, RelatednessConfig, RelatednessIndexer};
pub use semantic::{group_by_category, SearchOptions, SemanticSearchConfig, SemanticSearchEngine};
