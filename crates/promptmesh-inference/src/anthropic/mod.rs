//! Anthropic-style messages backend: single-shot generation plus streaming
//! tool-calling turns for the agent loop.

mod backend;
mod streaming;
mod types;

pub use backend::{AnthropicBackend, AnthropicConfig};
pub use streaming::{parse_event_stream, ProviderEvent, ProviderEventStream};
pub use types::{ChatMessage, ContentBlock, MessageContent, ToolSpec};

use promptmesh_core::Result;

/// One model turn: system instruction, conversation so far, declared tools.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub max_tokens: u32,
}

/// Seam for streaming tool-calling turns.
///
/// The agent loop consumes this trait; tests implement it with canned event
/// sequences instead of real network I/O.
#[async_trait::async_trait]
pub trait StreamingToolGeneration: Send + Sync {
    /// Start one model turn, returning a pull-based stream of typed events.
    async fn stream_turn(&self, request: TurnRequest) -> Result<ProviderEventStream>;

    /// The model name used by this backend.
    fn model_name(&self) -> &str;
}
