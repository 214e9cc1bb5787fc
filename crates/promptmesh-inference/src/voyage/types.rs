//! Request/response types for the Voyage embeddings API.

use serde::{Deserialize, Serialize};

/// Request body for `POST /v1/embeddings`.
#[derive(Debug, Serialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
    /// "document" or "query"; documents and queries embed asymmetrically.
    pub input_type: String,
}

/// One embedding in the response, tagged with its input index.
///
/// The provider may return entries out of order; `index` is authoritative.
#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,
    pub index: usize,
}

/// Response body from the embeddings endpoint.
#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
    pub model: String,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Token usage accounting.
#[derive(Debug, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_request_serializes_input_type() {
        let req = EmbeddingRequest {
            model: "voyage-3-lite".to_string(),
            input: vec!["hello".to_string()],
            input_type: "query".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "voyage-3-lite");
        assert_eq!(json["input_type"], "query");
        assert_eq!(json["input"][0], "hello");
    }

    #[test]
    fn test_embedding_response_deserializes() {
        let json = r#"{
            "data": [
                {"embedding": [0.1, 0.2], "index": 1},
                {"embedding": [0.3, 0.4], "index": 0}
            ],
            "model": "voyage-3-lite",
            "usage": {"total_tokens": 12}
        }"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.len(), 2);
        assert_eq!(resp.data[0].index, 1);
        assert_eq!(resp.usage.unwrap().total_tokens, 12);
    }

    #[test]
    fn test_embedding_response_without_usage() {
        let json = r#"{"data": [], "model": "voyage-3-lite"}"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert!(resp.usage.is_none());
    }
}
