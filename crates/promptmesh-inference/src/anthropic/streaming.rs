//! SSE stream parsing for streaming messages responses.
//!
//! The wire stream interleaves `event:` and `data:` lines; the JSON payload
//! carries its own `type` discriminator, so only `data:` lines are parsed.
//! Lines may be split across transport chunks, so parsing runs over a
//! carry-forward buffer.

use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;

use promptmesh_core::{Error, Result};

/// A typed event from a streaming model turn.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// Incremental text for the current text block.
    TextDelta(String),
    /// A tool-use block opened; its input arrives as JSON deltas.
    ToolUseStart {
        index: usize,
        id: String,
        name: String,
    },
    /// Partial JSON for the tool-use block at `index`.
    ToolInputDelta { index: usize, partial_json: String },
    /// The content block at `index` is complete. Tool calls must not be
    /// executed before this arrives.
    ContentBlockStop { index: usize },
    /// The model turn is complete.
    MessageStop,
}

/// Pull-based stream of provider events.
pub type ProviderEventStream = Pin<Box<dyn Stream<Item = Result<ProviderEvent>> + Send>>;

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    content_block: Option<RawContentBlock>,
    #[serde(default)]
    delta: Option<RawDelta>,
}

#[derive(Deserialize)]
struct RawContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawDelta {
    #[serde(rename = "type")]
    delta_type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    partial_json: Option<String>,
}

/// Parse a byte stream of SSE frames into provider events.
pub fn parse_event_stream(
    stream: impl Stream<Item = std::result::Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> ProviderEventStream {
    let event_stream = stream
        .map(|chunk_result| {
            chunk_result.map_err(|e| Error::Inference(format!("Stream error: {}", e)))
        })
        .scan(String::new(), |buffer, result| {
            let events = match result {
                Ok(bytes) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    drain_complete_lines(buffer)
                }
                Err(e) => vec![Err(e)],
            };
            futures::future::ready(Some(futures::stream::iter(events)))
        })
        .flatten();

    Box::pin(event_stream)
}

/// Consume complete lines from the buffer, leaving any partial trailing
/// line for the next chunk.
fn drain_complete_lines(buffer: &mut String) -> Vec<Result<ProviderEvent>> {
    let mut events = Vec::new();

    while let Some(newline) = buffer.find('\n') {
        let line: String = buffer.drain(..=newline).collect();
        if let Some(parsed) = parse_sse_line(line.trim()) {
            events.push(parsed);
        }
    }

    events
}

/// Parse a single SSE line into an event, if it carries one.
fn parse_sse_line(line: &str) -> Option<Result<ProviderEvent>> {
    // Skip blanks, comments, and `event:` lines; the JSON payload is
    // self-describing.
    if line.is_empty() || line.starts_with(':') || line.starts_with("event:") {
        return None;
    }

    let data = line.strip_prefix("data: ")?;

    if data == "[DONE]" {
        return Some(Ok(ProviderEvent::MessageStop));
    }

    let raw: RawEvent = match serde_json::from_str(data) {
        Ok(raw) => raw,
        Err(e) => {
            return Some(Err(Error::Inference(format!(
                "Failed to parse stream event: {}",
                e
            ))));
        }
    };

    match raw.event_type.as_str() {
        "content_block_start" => {
            let index = raw.index?;
            let block = raw.content_block?;
            if block.block_type == "tool_use" {
                Some(Ok(ProviderEvent::ToolUseStart {
                    index,
                    id: block.id.unwrap_or_default(),
                    name: block.name.unwrap_or_default(),
                }))
            } else {
                None
            }
        }
        "content_block_delta" => {
            let index = raw.index?;
            let delta = raw.delta?;
            match delta.delta_type.as_str() {
                "text_delta" => delta
                    .text
                    .filter(|t| !t.is_empty())
                    .map(|t| Ok(ProviderEvent::TextDelta(t))),
                "input_json_delta" => delta.partial_json.map(|partial_json| {
                    Ok(ProviderEvent::ToolInputDelta {
                        index,
                        partial_json,
                    })
                }),
                _ => None,
            }
        }
        "content_block_stop" => raw
            .index
            .map(|index| Ok(ProviderEvent::ContentBlockStop { index })),
        "message_stop" => Some(Ok(ProviderEvent::MessageStop)),
        // message_start, message_delta, ping: nothing for the loop to do.
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_delta() {
        let line = r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#;
        let event = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(event, ProviderEvent::TextDelta("Hello".to_string()));
    }

    #[test]
    fn test_parse_tool_use_start() {
        let line = r#"data: {"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"tu_1","name":"set_title"}}"#;
        let event = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(
            event,
            ProviderEvent::ToolUseStart {
                index: 1,
                id: "tu_1".to_string(),
                name: "set_title".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_text_block_start_is_silent() {
        let line = r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text"}}"#;
        assert!(parse_sse_line(line).is_none());
    }

    #[test]
    fn test_parse_input_json_delta() {
        let line = r#"data: {"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"title\":"}}"#;
        let event = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(
            event,
            ProviderEvent::ToolInputDelta {
                index: 1,
                partial_json: "{\"title\":".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_content_block_stop() {
        let line = r#"data: {"type":"content_block_stop","index":1}"#;
        let event = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(event, ProviderEvent::ContentBlockStop { index: 1 });
    }

    #[test]
    fn test_parse_message_stop() {
        let line = r#"data: {"type":"message_stop"}"#;
        let event = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(event, ProviderEvent::MessageStop);
    }

    #[test]
    fn test_parse_done_sentinel() {
        let event = parse_sse_line("data: [DONE]").unwrap().unwrap();
        assert_eq!(event, ProviderEvent::MessageStop);
    }

    #[test]
    fn test_parse_event_line_skipped() {
        assert!(parse_sse_line("event: content_block_delta").is_none());
    }

    #[test]
    fn test_parse_comment_and_blank_skipped() {
        assert!(parse_sse_line(": keepalive").is_none());
        assert!(parse_sse_line("").is_none());
    }

    #[test]
    fn test_parse_ping_is_silent() {
        let line = r#"data: {"type":"ping"}"#;
        assert!(parse_sse_line(line).is_none());
    }

    #[test]
    fn test_parse_invalid_json_is_error() {
        let result = parse_sse_line("data: {not json}").unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_drain_complete_lines_keeps_partial_tail() {
        let mut buffer = String::from(
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"a\"}}\ndata: {\"type\":\"mess",
        );
        let events = drain_complete_lines(&mut buffer);
        assert_eq!(events.len(), 1);
        assert_eq!(buffer, "data: {\"type\":\"mess");

        buffer.push_str("age_stop\"}\n");
        let events = drain_complete_lines(&mut buffer);
        assert_eq!(events.len(), 1);
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_parse_event_stream_across_chunk_boundary() {
        let chunks: Vec<std::result::Result<bytes::Bytes, reqwest::Error>> = vec![
            Ok(bytes::Bytes::from(
                "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel",
            )),
            Ok(bytes::Bytes::from("lo\"}}\ndata: {\"type\":\"message_stop\"}\n")),
        ];
        let stream = parse_event_stream(futures::stream::iter(chunks));
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            *events[0].as_ref().unwrap(),
            ProviderEvent::TextDelta("Hello".to_string())
        );
        assert_eq!(*events[1].as_ref().unwrap(), ProviderEvent::MessageStop);
    }
}
