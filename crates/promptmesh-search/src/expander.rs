//! LLM-based query expansion.
//!
//! A deliberate best-effort enhancement: every failure path (missing
//! credential, provider error, blank output) falls back to the original
//! query, never aborting the surrounding search.

use std::sync::Arc;

use tracing::{debug, warn};

use promptmesh_core::GenerationBackend;

/// Expands a user query into a denser comma-separated keyword set.
pub struct QueryExpander {
    backend: Arc<dyn GenerationBackend>,
}

impl QueryExpander {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Expand `query`, or return it unchanged on any failure.
    pub async fn expand(&self, query: &str) -> String {
        if !self.backend.is_configured() {
            return query.to_string();
        }

        let prompt = format!(
            "You are a search query expander for an AI prompts database. \
             Given a user's search query, expand it into relevant keywords and \
             synonyms that would help find matching AI prompts.\n\n\
             Return ONLY the expanded keywords, comma-separated, no explanations.\n\n\
             Query: \"{}\"\n\n\
             Expanded keywords:",
            query
        );

        match self.backend.generate(&prompt).await {
            Ok(expanded) => {
                let expanded = expanded.trim();
                if expanded.is_empty() {
                    debug!(query = query, "Expansion returned blank, keeping original");
                    query.to_string()
                } else {
                    debug!(query = query, expanded = expanded, "Query expanded");
                    expanded.to_string()
                }
            }
            Err(e) => {
                warn!(query = query, error = %e, "Query expansion failed, keeping original");
                query.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use promptmesh_core::{Error, Result};

    struct StubGeneration {
        response: Result<String>,
    }

    #[async_trait]
    impl GenerationBackend for StubGeneration {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            match &self.response {
                Ok(s) => Ok(s.clone()),
                Err(_) => Err(Error::Provider {
                    status: 500,
                    body: "boom".to_string(),
                }),
            }
        }

        async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
            self.generate(prompt).await
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    #[tokio::test]
    async fn test_expand_returns_keywords() {
        let expander = QueryExpander::new(Arc::new(StubGeneration {
            response: Ok("email, outreach, template, cold".to_string()),
        }));
        let expanded = expander.expand("write a cold email").await;
        assert_eq!(expanded, "email, outreach, template, cold");
    }

    #[tokio::test]
    async fn test_expand_trims_whitespace() {
        let expander = QueryExpander::new(Arc::new(StubGeneration {
            response: Ok("  email, template \n".to_string()),
        }));
        assert_eq!(expander.expand("q").await, "email, template");
    }

    #[tokio::test]
    async fn test_provider_error_falls_back_to_original() {
        let expander = QueryExpander::new(Arc::new(StubGeneration {
            response: Err(Error::Internal("unused".to_string())),
        }));
        assert_eq!(expander.expand("original query").await, "original query");
    }

    #[tokio::test]
    async fn test_blank_output_falls_back_to_original() {
        let expander = QueryExpander::new(Arc::new(StubGeneration {
            response: Ok("   ".to_string()),
        }));
        assert_eq!(expander.expand("original query").await, "original query");
    }
}
