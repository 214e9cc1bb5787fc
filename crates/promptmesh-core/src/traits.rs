//! Trait definitions for promptmesh backends and repositories.
//!
//! Backends wrap remote AI providers; repositories wrap the relational
//! store. Both are async-trait seams so the search, agent, and job crates
//! can be exercised against in-process stubs.

use async_trait::async_trait;
use pgvector::Vector;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Job, JobType, PromptMeta, PromptType, QueueStats, SearchHit, SimilarMatch,
};

// =============================================================================
// PROVIDER BACKENDS
// =============================================================================

/// Whether a text is embedded as stored content or as a retrieval query.
///
/// Documents and queries are embedded asymmetrically by the provider; mixing
/// the modes degrades retrieval quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    Document,
    Query,
}

impl EmbedMode {
    /// Wire value for the provider's `input_type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedMode::Document => "document",
            EmbedMode::Query => "query",
        }
    }
}

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed a single text in the given mode.
    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vector>;

    /// Embed a batch of texts, returning vectors in input order regardless
    /// of the provider's own response ordering.
    async fn embed_batch(&self, texts: &[String], mode: EmbedMode) -> Result<Vec<Vector>>;

    /// The dimension of vectors produced by this backend.
    fn dimension(&self) -> usize;

    /// The model name used by this backend.
    fn model_name(&self) -> &str;

    /// Whether this backend holds the credentials it needs. Availability
    /// checks consult this before attempting the pipeline.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Backend for single-shot text generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text from a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate text with a system instruction.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// The model name used by this backend.
    fn model_name(&self) -> &str;

    /// Whether this backend holds the credentials it needs.
    fn is_configured(&self) -> bool {
        true
    }
}

// =============================================================================
// SIMILARITY FILTER
// =============================================================================

/// Typed filter for vector similarity queries.
///
/// Compiled into WHERE clauses by the store; visibility predicates (not
/// private, not soft-deleted, embedding present) are always applied and are
/// not representable here by design.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityFilter {
    /// Minimum similarity; candidates strictly below are excluded entirely.
    pub threshold: f64,
    /// Maximum number of matches to return.
    pub limit: i64,
    /// Exclude this prompt id (self-exclusion for relatedness).
    pub exclude_id: Option<Uuid>,
    /// Restrict matches to this prompt type.
    pub same_type: Option<PromptType>,
    /// Whether unlisted prompts may appear. General search includes them;
    /// relatedness indexing does not.
    pub include_unlisted: bool,
}

impl SimilarityFilter {
    pub fn new(threshold: f64, limit: i64) -> Self {
        Self {
            threshold,
            limit,
            exclude_id: None,
            same_type: None,
            include_unlisted: true,
        }
    }

    pub fn exclude_id(mut self, id: Uuid) -> Self {
        self.exclude_id = Some(id);
        self
    }

    pub fn same_type(mut self, prompt_type: PromptType) -> Self {
        self.same_type = Some(prompt_type);
        self
    }

    pub fn include_unlisted(mut self, include: bool) -> Self {
        self.include_unlisted = include;
        self
    }
}

// =============================================================================
// REPOSITORIES
// =============================================================================

/// Repository for prompt read projections.
#[async_trait]
pub trait PromptRepository: Send + Sync {
    /// Fetch prompt metadata by id.
    async fn get_meta(&self, id: Uuid) -> Result<Option<PromptMeta>>;

    /// Hydrate raw similarity matches into full search hits, preserving the
    /// input order. Matches whose prompt no longer qualifies are dropped.
    async fn hydrate_hits(&self, matches: &[SimilarMatch]) -> Result<Vec<SearchHit>>;

    /// Case-insensitive substring search over title/description/content,
    /// restricted to public, non-deleted prompts. Hits carry the fixed
    /// similarity sentinel `1.0`.
    async fn substring_search(&self, query: &str, limit: i64) -> Result<Vec<SearchHit>>;

    /// Ids of public, non-deleted prompts that have no stored embedding.
    async fn list_unembedded(&self) -> Result<Vec<Uuid>>;

    /// Set or clear the unlisted flag on a prompt.
    async fn set_unlisted(&self, id: Uuid, unlisted: bool) -> Result<()>;
}

/// Repository for embedding vectors and similarity retrieval.
#[async_trait]
pub trait EmbeddingRepository: Send + Sync {
    /// Store or replace the embedding for a prompt.
    async fn upsert(&self, prompt_id: Uuid, vector: &Vector) -> Result<()>;

    /// Fetch the stored embedding for a prompt, if one exists.
    async fn get(&self, prompt_id: Uuid) -> Result<Option<Vector>>;

    /// Top-k cosine-similar prompts, descending by similarity, hard-excluding
    /// candidates below the filter's threshold.
    async fn top_k_similar(
        &self,
        query: &Vector,
        filter: &SimilarityFilter,
    ) -> Result<Vec<SimilarMatch>>;
}

/// Repository for label-namespaced relatedness edges.
#[async_trait]
pub trait EdgeRepository: Send + Sync {
    /// Atomically replace all edges with `label` sourced from `source_id`
    /// with the given ranked targets (position = index). Inserts that would
    /// violate uniqueness are skipped, not errored.
    async fn replace_for_source(
        &self,
        source_id: Uuid,
        label: &str,
        targets: &[Uuid],
    ) -> Result<()>;

    /// Delete all edges with `label` sourced from `source_id`.
    async fn delete_for_source(&self, source_id: Uuid, label: &str) -> Result<()>;

    /// Target ids for `source_id` under `label`, ordered by position.
    async fn targets_for_source(&self, source_id: Uuid, label: &str) -> Result<Vec<Uuid>>;
}

/// Repository for job queue operations.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Queue a new job.
    async fn queue(
        &self,
        prompt_id: Option<Uuid>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Uuid>;

    /// Queue a job unless one of the same type for the same prompt is
    /// already pending.
    async fn queue_deduplicated(
        &self,
        prompt_id: Option<Uuid>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Option<Uuid>>;

    /// Claim the next pending job for processing.
    async fn claim_next(&self) -> Result<Option<Job>>;

    /// Update job progress.
    async fn update_progress(
        &self,
        job_id: Uuid,
        percent: i32,
        message: Option<&str>,
    ) -> Result<()>;

    /// Mark a job completed with an optional result payload.
    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()>;

    /// Mark a job failed; requeues automatically while retries remain.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Fetch a job by id.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Number of pending jobs.
    async fn pending_count(&self) -> Result<i64>;

    /// Queue statistics summary.
    async fn queue_stats(&self) -> Result<QueueStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_mode_wire_values() {
        assert_eq!(EmbedMode::Document.as_str(), "document");
        assert_eq!(EmbedMode::Query.as_str(), "query");
    }

    #[test]
    fn test_similarity_filter_builders() {
        let id = Uuid::nil();
        let filter = SimilarityFilter::new(0.5, 4)
            .exclude_id(id)
            .same_type(PromptType::Text)
            .include_unlisted(false);

        assert_eq!(filter.threshold, 0.5);
        assert_eq!(filter.limit, 4);
        assert_eq!(filter.exclude_id, Some(id));
        assert_eq!(filter.same_type, Some(PromptType::Text));
        assert!(!filter.include_unlisted);
    }

    #[test]
    fn test_similarity_filter_defaults_include_unlisted() {
        let filter = SimilarityFilter::new(0.4, 20);
        assert!(filter.include_unlisted);
        assert!(filter.exclude_id.is_none());
        assert!(filter.same_type.is_none());
    }
}
