//! # promptmesh-inference
//!
//! Remote AI provider backends for promptmesh:
//!
//! - [`VoyageBackend`] — embedding provider adapter with asymmetric
//!   document/query modes and order-preserving batch embedding.
//! - [`AnthropicBackend`] — messages backend for single-shot generation and
//!   streaming tool-calling turns.

pub mod anthropic;
pub mod voyage;

pub use anthropic::{
    parse_event_stream, AnthropicBackend, AnthropicConfig, ChatMessage, ContentBlock,
    MessageContent, ProviderEvent, ProviderEventStream, StreamingToolGeneration, ToolSpec,
    TurnRequest,
};
pub use voyage::{VoyageBackend, VoyageConfig};
