//! Conversational prompt builder: a bounded tool-calling agent loop over a
//! streaming generation backend.

pub mod prompt;
pub mod session;
pub mod tools;

pub use session::{AgentEvent, AgentSession, ChatInput};
pub use tools::{apply_tool_op, parse_tool_call, tool_definitions, ToolOp, ToolOutcome};
