//! Messages backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use promptmesh_core::{Error, GenerationBackend, Result};

use super::streaming::{parse_event_stream, ProviderEventStream};
use super::types::*;
use super::{StreamingToolGeneration, TurnRequest};

/// Default messages API endpoint.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1";

/// Default generation model.
pub const DEFAULT_GEN_MODEL: &str = "claude-sonnet-4-20250514";

/// Default max output tokens for single-shot generation.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// API version header value.
const API_VERSION: &str = "2023-06-01";

/// Configuration for the messages backend.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key; required before any request is attempted.
    pub api_key: Option<String>,
    /// Generation model name.
    pub model: String,
    /// Max output tokens for single-shot calls.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ANTHROPIC_URL.to_string(),
            api_key: None,
            model: DEFAULT_GEN_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AnthropicConfig {
    /// Read configuration from `ANTHROPIC_API_KEY`, `ANTHROPIC_BASE_URL`,
    /// `ANTHROPIC_GEN_MODEL`, `ANTHROPIC_MAX_TOKENS`, `ANTHROPIC_TIMEOUT`.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_URL.to_string()),
            api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            model: std::env::var("ANTHROPIC_GEN_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEN_MODEL.to_string()),
            max_tokens: std::env::var("ANTHROPIC_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_TOKENS),
            timeout_seconds: std::env::var("ANTHROPIC_TIMEOUT")
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

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Messages backend for single-shot generation and streaming tool turns.
pub struct AnthropicBackend {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(AnthropicConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }

    /// Whether a credential is configured.
    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn build_request(&self) -> Result<reqwest::RequestBuilder> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Configuration("ANTHROPIC_API_KEY not set".to_string()))?;

        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        Ok(self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json"))
    }

    /// Single-shot messages call returning the parsed response.
    async fn send_messages(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        let response = self
            .build_request()?
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Generating"
        );

        let request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: (!system.is_empty()).then(|| system.to_string()),
            messages: vec![ChatMessage::user(prompt)],
            tools: vec![],
            stream: false,
        };

        let result = self.send_messages(&request).await?;
        let content = result.first_text().unwrap_or_default().to_string();

        debug!(response_len = content.len(), "Generation complete");
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}

#[async_trait]
impl StreamingToolGeneration for AnthropicBackend {
    async fn stream_turn(&self, request: TurnRequest) -> Result<ProviderEventStream> {
        debug!(
            model = %self.config.model,
            tool_count = request.tools.len(),
            message_count = request.messages.len(),
            "Starting streaming turn"
        );

        let body = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: request.max_tokens,
            system: (!request.system.is_empty()).then_some(request.system),
            messages: request.messages,
            tools: request.tools,
            stream: true,
        };

        let response = self
            .build_request()?
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider { status, body });
        }

        Ok(parse_event_stream(response.bytes_stream()))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnthropicConfig::default();
        assert_eq!(config.base_url, DEFAULT_ANTHROPIC_URL);
        assert_eq!(config.model, DEFAULT_GEN_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_config_builders() {
        let config = AnthropicConfig::default()
            .with_api_key("sk-test")
            .with_model("claude-haiku-4")
            .with_max_tokens(1000);
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model, "claude-haiku-4");
        assert_eq!(config.max_tokens, 1000);
    }

    #[tokio::test]
    async fn test_generate_without_credential_is_configuration_error() {
        let backend = AnthropicBackend::new(AnthropicConfig::default()).unwrap();
        let err = backend.generate("hello").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_stream_turn_without_credential_is_configuration_error() {
        let backend = AnthropicBackend::new(AnthropicConfig::default()).unwrap();
        let err = backend
            .stream_turn(TurnRequest {
                system: String::new(),
                messages: vec![ChatMessage::user("hi")],
                tools: vec![],
                max_tokens: 100,
            })
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
