//! Tunable defaults for the promptmesh pipeline.
//!
//! Thresholds are context-specific, not global: general search filters at
//! 0.4, exemplar retrieval for improvement is deliberately more lenient at
//! 0.3 (inspirational rather than precision retrieval), and relatedness
//! indexing is stricter at 0.5 because stale edges are worse than few edges.

/// Minimum cosine similarity for general semantic search results.
pub const SEARCH_SIMILARITY_THRESHOLD: f64 = 0.4;

/// Minimum cosine similarity for improvement-service exemplar retrieval.
pub const EXEMPLAR_SIMILARITY_THRESHOLD: f64 = 0.3;

/// Minimum cosine similarity for relatedness edges.
pub const RELATED_SIMILARITY_THRESHOLD: f64 = 0.5;

/// Maximum number of relatedness neighbors persisted per prompt.
pub const RELATED_NEIGHBOR_LIMIT: i64 = 4;

/// Default result limit for semantic search.
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;

/// Number of exemplars retrieved for the improvement service.
pub const EXEMPLAR_LIMIT: i64 = 3;

/// Maximum characters of exemplar content included in the improvement
/// prompt before truncation.
pub const EXEMPLAR_SNIPPET_CHARS: usize = 500;

/// Maximum output tokens for a single improvement generation.
pub const IMPROVE_MAX_TOKENS: u32 = 4000;

/// Maximum model turns in one agent-loop invocation.
pub const MAX_AGENT_ITERATIONS: usize = 10;

/// Maximum jobs processed concurrently by the worker.
pub const JOB_MAX_CONCURRENT: usize = 2;

/// Default polling interval for the job worker in milliseconds.
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

/// Default maximum retries for failed jobs.
pub const JOB_MAX_RETRIES: i32 = 3;

/// Hard wall-clock limit for a single job execution.
pub const JOB_TIMEOUT_SECS: u64 = 600;

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Fixed delay between provider calls during embedding backfill.
pub const BACKFILL_DELAY_MS: u64 = 500;

/// Similarity sentinel carried by fallback substring search hits.
pub const FALLBACK_SIMILARITY: f64 = 1.0;

/// Minimum content length (characters) before the quality check consults
/// the model.
pub const QUALITY_MIN_CHARS: usize = 50;

/// Minimum content length (words) before the quality check consults the
/// model.
pub const QUALITY_MIN_WORDS: usize = 10;

/// Minimum model confidence required for a negative quality verdict to
/// delist a prompt.
pub const QUALITY_CONFIDENCE_FLOOR: f64 = 0.85;

/// Chat endpoint rate limit: requests allowed per window per user.
pub const CHAT_RATE_LIMIT_REQUESTS: u32 = 10;

/// Chat endpoint rate limit window in seconds.
pub const CHAT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
