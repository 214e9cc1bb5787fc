//! The bounded tool-calling loop behind the conversational builder.
//!
//! Each iteration streams one model turn, assembles tool calls from typed
//! provider events, executes them against the draft, and feeds the results
//! back as the next turn's input. The loop ends when a turn produces no tool
//! calls or when the iteration cap is reached.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use promptmesh_core::defaults::MAX_AGENT_ITERATIONS;
use promptmesh_core::{CategoryRef, DraftState, Result, TagRef};
use promptmesh_inference::{
    ChatMessage, ContentBlock, ProviderEvent, StreamingToolGeneration, ToolSpec, TurnRequest,
};

use crate::prompt::build_system_instruction;
use crate::tools::{apply_tool_op, parse_tool_call, tool_definitions, ToolOutcome};

const TURN_MAX_TOKENS: u32 = 4096;

/// Message streamed when the loop hits the iteration cap instead of ending
/// naturally.
const CAP_CLOSING_MESSAGE: &str =
    "I've made several changes. Let me know if you need anything else!";

/// Event emitted to the consumer during a builder conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Text { text: String },
    ToolCall { name: String, input: JsonValue },
    State { draft: DraftState },
    Done,
    Error { message: String },
}

/// One builder chat request: the user's message plus the caller-owned draft
/// and whitelists.
#[derive(Debug, Clone)]
pub struct ChatInput {
    pub message: String,
    pub draft: DraftState,
    pub categories: Vec<CategoryRef>,
    pub tags: Vec<TagRef>,
}

/// A tool-use block being assembled from streamed deltas.
struct PendingToolUse {
    id: String,
    name: String,
    json_buf: String,
}

/// A fully assembled tool call, ready to execute.
struct AssembledToolCall {
    id: String,
    name: String,
    input: JsonValue,
}

/// Outcome of one streamed model turn.
struct TurnOutput {
    text: String,
    tool_calls: Vec<AssembledToolCall>,
}

pub struct AgentSession<G: StreamingToolGeneration> {
    backend: G,
    max_iterations: usize,
}

impl<G: StreamingToolGeneration> AgentSession<G> {
    pub fn new(backend: G) -> Self {
        Self {
            backend,
            max_iterations: MAX_AGENT_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Run the loop for one user message, emitting events as they occur.
    ///
    /// Returns the final draft. A closed `events` receiver ends the run
    /// early without error; the draft mutations made so far are kept.
    pub async fn run(
        &self,
        input: ChatInput,
        events: mpsc::Sender<AgentEvent>,
    ) -> Result<DraftState> {
        let ChatInput {
            message,
            mut draft,
            categories,
            tags,
        } = input;

        let tools = tool_definitions();
        let mut messages = vec![ChatMessage::user(message)];

        for iteration in 0..self.max_iterations {
            let turn = match self
                .stream_one_turn(&draft, &categories, &tags, &messages, &tools, &events)
                .await
            {
                Ok(Some(turn)) => turn,
                // Consumer went away mid-turn.
                Ok(None) => return Ok(draft),
                Err(err) => {
                    let _ = events
                        .send(AgentEvent::Error {
                            message: err.to_string(),
                        })
                        .await;
                    return Err(err);
                }
            };

            if turn.tool_calls.is_empty() {
                debug!(iteration, "Turn produced no tool calls, ending loop");
                break;
            }

            info!(
                iteration,
                tool_count = turn.tool_calls.len(),
                "Executing tool calls"
            );

            let mut assistant_blocks = Vec::new();
            if !turn.text.is_empty() {
                assistant_blocks.push(ContentBlock::Text {
                    text: turn.text.clone(),
                });
            }
            let mut result_blocks = Vec::new();

            for call in &turn.tool_calls {
                assistant_blocks.push(ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.input.clone(),
                });

                if !send(
                    &events,
                    AgentEvent::ToolCall {
                        name: call.name.clone(),
                        input: call.input.clone(),
                    },
                )
                .await
                {
                    return Ok(draft);
                }

                let outcome = execute(&mut draft, call, &categories, &tags);
                if outcome.ok {
                    if !send(
                        &events,
                        AgentEvent::State {
                            draft: draft.clone(),
                        },
                    )
                    .await
                    {
                        return Ok(draft);
                    }
                } else {
                    warn!(tool = %call.name, message = %outcome.message, "Tool call rejected");
                }

                result_blocks.push(ContentBlock::ToolResult {
                    tool_use_id: call.id.clone(),
                    content: outcome.payload(),
                });
            }

            messages.push(ChatMessage::assistant_blocks(assistant_blocks));
            messages.push(ChatMessage::user_blocks(result_blocks));

            if iteration + 1 == self.max_iterations {
                info!(iteration, "Iteration cap reached, closing out");
                if !send(
                    &events,
                    AgentEvent::Text {
                        text: CAP_CLOSING_MESSAGE.to_string(),
                    },
                )
                .await
                {
                    return Ok(draft);
                }
            }
        }

        if !send(
            &events,
            AgentEvent::State {
                draft: draft.clone(),
            },
        )
        .await
        {
            return Ok(draft);
        }
        let _ = events.send(AgentEvent::Done).await;
        Ok(draft)
    }

    /// Stream one model turn, forwarding text deltas and assembling tool
    /// calls. A tool call becomes executable only once its content block
    /// stop arrives.
    ///
    /// `Ok(None)` means the event consumer disappeared.
    async fn stream_one_turn(
        &self,
        draft: &DraftState,
        categories: &[CategoryRef],
        tags: &[TagRef],
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        events: &mpsc::Sender<AgentEvent>,
    ) -> Result<Option<TurnOutput>> {
        use futures::StreamExt;

        let request = TurnRequest {
            system: build_system_instruction(draft, categories, tags),
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            max_tokens: TURN_MAX_TOKENS,
        };

        let mut stream = self.backend.stream_turn(request).await?;

        let mut text = String::new();
        let mut pending: BTreeMap<usize, PendingToolUse> = BTreeMap::new();
        let mut tool_calls = Vec::new();

        while let Some(event) = stream.next().await {
            match event? {
                ProviderEvent::TextDelta(delta) => {
                    text.push_str(&delta);
                    if !send(events, AgentEvent::Text { text: delta }).await {
                        return Ok(None);
                    }
                }
                ProviderEvent::ToolUseStart { index, id, name } => {
                    pending.insert(
                        index,
                        PendingToolUse {
                            id,
                            name,
                            json_buf: String::new(),
                        },
                    );
                }
                ProviderEvent::ToolInputDelta {
                    index,
                    partial_json,
                } => {
                    if let Some(tool) = pending.get_mut(&index) {
                        tool.json_buf.push_str(&partial_json);
                    }
                }
                ProviderEvent::ContentBlockStop { index } => {
                    if let Some(tool) = pending.remove(&index) {
                        tool_calls.push(assemble(tool));
                    }
                }
                ProviderEvent::MessageStop => break,
            }
        }

        Ok(Some(TurnOutput { text, tool_calls }))
    }
}

/// Finalize a pending tool call. An empty input buffer means a no-argument
/// call; unparseable JSON is kept as null and rejected at execution time.
fn assemble(tool: PendingToolUse) -> AssembledToolCall {
    let input = if tool.json_buf.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&tool.json_buf).unwrap_or(JsonValue::Null)
    };
    AssembledToolCall {
        id: tool.id,
        name: tool.name,
        input,
    }
}

fn execute(
    draft: &mut DraftState,
    call: &AssembledToolCall,
    categories: &[CategoryRef],
    tags: &[TagRef],
) -> ToolOutcome {
    match parse_tool_call(&call.name, &call.input) {
        Ok(op) => apply_tool_op(draft, &op, categories, tags),
        Err(message) => ToolOutcome { ok: false, message },
    }
}

async fn send(events: &mpsc::Sender<AgentEvent>, event: AgentEvent) -> bool {
    events.send(event).await.is_ok()
}
