//! Error types for promptmesh.

use thiserror::Error;

/// Result type alias using promptmesh's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for promptmesh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Prompt not found
    #[error("Prompt not found: {0}")]
    PromptNotFound(uuid::Uuid),

    /// Required credential or feature flag absent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-2xx response from an external provider, with the body text
    #[error("Provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    /// Model returned blank content after a successful call
    #[error("Empty generation from model")]
    EmptyGeneration,

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Search operation failed
    #[error("Search error: {0}")]
    Search(String),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Request rejected by the rate limiter; retry after `reset_secs`.
    #[error("Rate limit exceeded, retry in {reset_secs}s")]
    RateLimited { reset_secs: u64 },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_prompt_not_found() {
        let id = Uuid::nil();
        let err = Error::PromptNotFound(id);
        assert_eq!(
            err.to_string(),
            format!("Prompt not found: {}", id)
        );
    }

    #[test]
    fn test_error_display_configuration() {
        let err = Error::Configuration("VOYAGE_API_KEY not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: VOYAGE_API_KEY not set"
        );
    }

    #[test]
    fn test_error_display_provider() {
        let err = Error::Provider {
            status: 429,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "Provider error (429): overloaded");
    }

    #[test]
    fn test_error_display_empty_generation() {
        let err = Error::EmptyGeneration;
        assert_eq!(err.to_string(), "Empty generation from model");
    }

    #[test]
    fn test_error_display_embedding() {
        let err = Error::Embedding("dimension mismatch".to_string());
        assert_eq!(err.to_string(), "Embedding error: dimension mismatch");
    }

    #[test]
    fn test_error_display_rate_limited() {
        let err = Error::RateLimited { reset_secs: 42 };
        assert_eq!(err.to_string(), "Rate limit exceeded, retry in 42s");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
