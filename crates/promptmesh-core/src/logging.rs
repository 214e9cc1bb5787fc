//! Structured logging schema and field name constants for promptmesh.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (hits, tokens) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated across request → job → sub-calls.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "search", "db", "inference", "agent", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "search", "embed", "improve", "reindex", "agent_turn"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Prompt UUID being operated on.
pub const PROMPT_ID: &str = "prompt_id";

/// Job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Job type enum variant.
pub const JOB_TYPE: &str = "job_type";

/// Search query text.
pub const QUERY: &str = "query";

/// Model identifier used for an embedding or generation call.
pub const MODEL: &str = "model";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or retrieval.
pub const RESULT_COUNT: &str = "result_count";

/// Number of input texts sent to the embedding provider.
pub const INPUT_COUNT: &str = "input_count";

/// Cosine similarity of a match.
pub const SIMILARITY: &str = "similarity";

// ─── Agent loop fields ─────────────────────────────────────────────────────

/// Current iteration of the agent loop (1-based).
pub const ITERATION: &str = "iteration";

/// Tool name proposed or executed by the agent loop.
pub const TOOL: &str = "tool";

/// Number of tool calls collected in one model turn.
pub const TOOL_COUNT: &str = "tool_count";
