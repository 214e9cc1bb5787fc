//! Voyage AI embedding backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use promptmesh_core::{EmbedMode, EmbeddingBackend, Error, Result, Vector};

use super::types::*;

/// Default Voyage API endpoint.
pub const DEFAULT_VOYAGE_URL: &str = "https://api.voyageai.com/v1";

/// Default embedding model.
pub const DEFAULT_EMBED_MODEL: &str = "voyage-3-lite";

/// Embedding dimension for voyage-3-lite.
pub const DEFAULT_DIMENSION: usize = 1024;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the Voyage embedding backend.
#[derive(Debug, Clone)]
pub struct VoyageConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key; required before any request is attempted.
    pub api_key: Option<String>,
    /// Embedding model name.
    pub model: String,
    /// Expected embedding dimension.
    pub dimension: usize,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for VoyageConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_VOYAGE_URL.to_string(),
            api_key: None,
            model: DEFAULT_EMBED_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl VoyageConfig {
    /// Read configuration from `VOYAGE_API_KEY`, `VOYAGE_BASE_URL`,
    /// `VOYAGE_EMBED_MODEL`, `VOYAGE_EMBED_DIM`, `VOYAGE_TIMEOUT`.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("VOYAGE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_VOYAGE_URL.to_string()),
            api_key: std::env::var("VOYAGE_API_KEY").ok(),
            model: std::env::var("VOYAGE_EMBED_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string()),
            dimension: std::env::var("VOYAGE_EMBED_DIM")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DIMENSION),
            timeout_seconds: std::env::var("VOYAGE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Embedding provider adapter for the Voyage API.
///
/// No retries at this layer; retrying is the caller's responsibility.
pub struct VoyageBackend {
    client: Client,
    config: VoyageConfig,
}

impl VoyageBackend {
    /// Create a new Voyage backend with the given configuration.
    pub fn new(config: VoyageConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(VoyageConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &VoyageConfig {
        &self.config
    }

    /// Whether a credential is configured (availability precondition for
    /// the semantic pipeline).
    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("VOYAGE_API_KEY not set".to_string()))
    }
}

#[async_trait]
impl EmbeddingBackend for VoyageBackend {
    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vector> {
        let mut vectors = self.embed_batch(&[text.to_string()], mode).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("Provider returned no embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[String], mode: EmbedMode) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // Credential check happens before any I/O.
        let api_key = self.api_key()?;

        debug!(
            input_count = texts.len(),
            model = %self.config.model,
            mode = mode.as_str(),
            "Embedding texts"
        );

        let request = EmbeddingRequest {
            model: self.config.model.clone(),
            input: texts.to_vec(),
            input_type: mode.as_str().to_string(),
        };

        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider { status, body });
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {}", e)))?;

        if result.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Provider returned {} embeddings for {} inputs",
                result.data.len(),
                texts.len()
            )));
        }

        // The provider may answer out of order; its declared index is
        // authoritative for restoring input order.
        let mut data = result.data;
        data.sort_by_key(|d| d.index);

        let vectors: Vec<Vector> = data
            .into_iter()
            .map(|d| Vector::from(d.embedding))
            .collect();

        debug!(result_count = vectors.len(), "Generated embeddings");
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}
