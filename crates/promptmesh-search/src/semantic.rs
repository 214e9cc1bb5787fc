//! Semantic search orchestrator.
//!
//! Composes the classifier, the fail-soft query expander, the embedding
//! backend, and the vector store into ranked, category-grouped results.
//! When the vector pipeline is unavailable the caller should use
//! [`SemanticSearchEngine::fallback_search`] instead.

use std::sync::Arc;

use tracing::{debug, info};

use promptmesh_core::defaults::{DEFAULT_SEARCH_LIMIT, SEARCH_SIMILARITY_THRESHOLD};
use promptmesh_core::{
    CategoryGroup, EmbedMode, EmbeddingBackend, EmbeddingRepository, FeatureFlags,
    PromptRepository, Result, SearchHit, SearchResponse, SimilarityFilter,
};

use crate::classifier::is_natural_language;
use crate::expander::QueryExpander;

/// Name of the synthetic bucket for results without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Configuration for the semantic search engine.
#[derive(Debug, Clone)]
pub struct SemanticSearchConfig {
    /// Minimum cosine similarity; candidates below are excluded entirely.
    pub threshold: f64,
    /// Result limit applied when the caller does not specify one.
    pub default_limit: i64,
}

impl Default for SemanticSearchConfig {
    fn default() -> Self {
        Self {
            threshold: SEARCH_SIMILARITY_THRESHOLD,
            default_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SemanticSearchConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_default_limit(mut self, limit: i64) -> Self {
        self.default_limit = limit;
        self
    }
}

/// Per-request search options.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Force expansion regardless of the classifier's verdict.
    pub expand: bool,
    /// Result limit; falls back to the engine's default.
    pub limit: Option<i64>,
}

/// The semantic search orchestrator.
pub struct SemanticSearchEngine {
    prompts: Arc<dyn PromptRepository>,
    embeddings: Arc<dyn EmbeddingRepository>,
    embedder: Arc<dyn EmbeddingBackend>,
    expander: QueryExpander,
    flags: FeatureFlags,
    config: SemanticSearchConfig,
}

impl SemanticSearchEngine {
    pub fn new(
        prompts: Arc<dyn PromptRepository>,
        embeddings: Arc<dyn EmbeddingRepository>,
        embedder: Arc<dyn EmbeddingBackend>,
        expander: QueryExpander,
        flags: FeatureFlags,
    ) -> Self {
        Self {
            prompts,
            embeddings,
            embedder,
            expander,
            flags,
            config: SemanticSearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SemanticSearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether the vector pipeline can serve queries: credential present
    /// and the search flag enabled. Callers fall back to
    /// [`fallback_search`](Self::fallback_search) when false.
    pub fn is_available(&self) -> bool {
        self.flags.ai_search && self.embedder.is_configured()
    }

    /// Run the full pipeline: classify → (expand) → embed → retrieve →
    /// hydrate → group.
    pub async fn search(&self, query: &str, opts: &SearchOptions) -> Result<SearchResponse> {
        let limit = opts.limit.unwrap_or(self.config.default_limit);
        let should_expand = opts.expand || is_natural_language(query);

        let (retrieval_query, expanded_query) = if should_expand {
            let expanded = self.expander.expand(query).await;
            if expanded != query {
                (expanded.clone(), Some(expanded))
            } else {
                (query.to_string(), None)
            }
        } else {
            (query.to_string(), None)
        };
        let expanded = expanded_query.is_some();

        debug!(
            query = query,
            expanded = expanded,
            limit = limit,
            "Running semantic search"
        );

        let query_vector = self.embedder.embed(&retrieval_query, EmbedMode::Query).await?;

        let filter = SimilarityFilter::new(self.config.threshold, limit);
        let matches = self.embeddings.top_k_similar(&query_vector, &filter).await?;
        let results = self.prompts.hydrate_hits(&matches).await?;
        let grouped_by_category = group_by_category(&results);

        info!(
            query = query,
            result_count = results.len(),
            expanded = expanded,
            "Semantic search complete"
        );

        Ok(SearchResponse {
            results,
            grouped_by_category,
            expanded,
            expanded_query,
        })
    }

    /// Plain substring search used when the vector pipeline is unavailable.
    /// Hits carry the fixed similarity sentinel since there is no real
    /// similarity semantic.
    pub async fn fallback_search(&self, query: &str, limit: Option<i64>) -> Result<Vec<SearchHit>> {
        let limit = limit.unwrap_or(self.config.default_limit);
        self.prompts.substring_search(query, limit).await
    }
}

/// Group hits by category name, bucketing uncategorized results under
/// [`UNCATEGORIZED`]. Buckets are ordered by descending member count;
/// ties keep first-seen order.
pub fn group_by_category(hits: &[SearchHit]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();

    for hit in hits {
        let name = hit
            .category_name
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        match groups.iter_mut().find(|g| g.category == name) {
            Some(group) => group.results.push(hit.clone()),
            None => groups.push(CategoryGroup {
                category: name,
                results: vec![hit.clone()],
            }),
        }
    }

    // Stable: equal-sized buckets keep first-seen order.
    groups.sort_by(|a, b| b.results.len().cmp(&a.results.len()));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pgvector::Vector;
    use promptmesh_core::{
        Error, PromptMeta, PromptType, SimilarMatch,
    };
    use std::sync::Mutex;
    use uuid::Uuid;

    fn hit(category: Option<&str>, similarity: f64) -> SearchHit {
        SearchHit {
            id: Uuid::new_v4(),
            slug: "slug".to_string(),
            title: "title".to_string(),
            description: None,
            content: "content".to_string(),
            prompt_type: PromptType::Text,
            author_name: None,
            category_name: category.map(String::from),
            tags: vec![],
            vote_count: 0,
            similarity,
        }
    }

    // ─── Stubs ─────────────────────────────────────────────────────────────

    struct StubPrompts {
        substring_hits: Vec<SearchHit>,
    }

    #[async_trait]
    impl PromptRepository for StubPrompts {
        async fn get_meta(&self, _id: Uuid) -> Result<Option<PromptMeta>> {
            Ok(None)
        }

        async fn hydrate_hits(&self, matches: &[SimilarMatch]) -> Result<Vec<SearchHit>> {
            Ok(matches
                .iter()
                .map(|m| SearchHit {
                    id: m.id,
                    similarity: m.similarity,
                    ..hit(Some("Writing"), m.similarity)
                })
                .collect())
        }

        async fn substring_search(&self, _query: &str, _limit: i64) -> Result<Vec<SearchHit>> {
            Ok(self.substring_hits.clone())
        }

        async fn list_unembedded(&self) -> Result<Vec<Uuid>> {
            Ok(vec![])
        }

        async fn set_unlisted(&self, _id: Uuid, _unlisted: bool) -> Result<()> {
            Ok(())
        }
    }

    struct StubEmbeddings {
        matches: Vec<SimilarMatch>,
        seen_filter: Mutex<Option<SimilarityFilter>>,
    }

    #[async_trait]
    impl EmbeddingRepository for StubEmbeddings {
        async fn upsert(&self, _prompt_id: Uuid, _vector: &Vector) -> Result<()> {
            Ok(())
        }

        async fn get(&self, _prompt_id: Uuid) -> Result<Option<Vector>> {
            Ok(None)
        }

        async fn top_k_similar(
            &self,
            _query: &Vector,
            filter: &SimilarityFilter,
        ) -> Result<Vec<SimilarMatch>> {
            *self.seen_filter.lock().unwrap() = Some(filter.clone());
            Ok(self.matches.clone())
        }
    }

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingBackend for StubEmbedder {
        async fn embed(&self, _text: &str, _mode: EmbedMode) -> Result<Vector> {
            Ok(Vector::from(vec![0.0_f32; 4]))
        }

        async fn embed_batch(&self, texts: &[String], _mode: EmbedMode) -> Result<Vec<Vector>> {
            Ok(texts.iter().map(|_| Vector::from(vec![0.0_f32; 4])).collect())
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "stub-embed"
        }
    }

    struct FailingGeneration;

    #[async_trait]
    impl promptmesh_core::GenerationBackend for FailingGeneration {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(Error::Provider {
                status: 503,
                body: "unavailable".to_string(),
            })
        }

        async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
            Err(Error::Provider {
                status: 503,
                body: "unavailable".to_string(),
            })
        }

        fn model_name(&self) -> &str {
            "stub-gen"
        }
    }

    struct EchoGeneration(String);

    #[async_trait]
    impl promptmesh_core::GenerationBackend for EchoGeneration {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }

        async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }

        fn model_name(&self) -> &str {
            "stub-gen"
        }
    }

    fn engine_with(
        matches: Vec<SimilarMatch>,
        generation: Arc<dyn promptmesh_core::GenerationBackend>,
    ) -> (SemanticSearchEngine, Arc<StubEmbeddings>) {
        let embeddings = Arc::new(StubEmbeddings {
            matches,
            seen_filter: Mutex::new(None),
        });
        let engine = SemanticSearchEngine::new(
            Arc::new(StubPrompts {
                substring_hits: vec![],
            }),
            embeddings.clone(),
            Arc::new(StubEmbedder),
            QueryExpander::new(generation),
            FeatureFlags::default(),
        );
        (engine, embeddings)
    }

    // ─── Tests ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_expansion_fail_soft_still_returns_results() {
        let m = SimilarMatch {
            id: Uuid::new_v4(),
            similarity: 0.8,
        };
        let (engine, _) = engine_with(vec![m], Arc::new(FailingGeneration));

        let response = engine
            .search("What is the best prompt?", &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(response.results.len(), 1);
        // Expansion failed and fell back to the original text.
        assert!(!response.expanded);
        assert!(response.expanded_query.is_none());
    }

    #[tokio::test]
    async fn test_expanded_flag_truthful_when_text_differs() {
        let (engine, _) = engine_with(
            vec![],
            Arc::new(EchoGeneration("prompt, template, best".to_string())),
        );

        let response = engine
            .search("What is the best prompt?", &SearchOptions::default())
            .await
            .unwrap();

        assert!(response.expanded);
        assert_eq!(
            response.expanded_query.as_deref(),
            Some("prompt, template, best")
        );
    }

    #[tokio::test]
    async fn test_keyword_query_skips_expansion() {
        // EchoGeneration would change the text; a keyword query must never
        // reach it.
        let (engine, _) = engine_with(
            vec![],
            Arc::new(EchoGeneration("should not appear".to_string())),
        );

        let response = engine
            .search("email template", &SearchOptions::default())
            .await
            .unwrap();

        assert!(!response.expanded);
    }

    #[tokio::test]
    async fn test_explicit_expand_overrides_classifier() {
        let (engine, _) = engine_with(
            vec![],
            Arc::new(EchoGeneration("email, outreach".to_string())),
        );

        let response = engine
            .search(
                "email template",
                &SearchOptions {
                    expand: true,
                    limit: None,
                },
            )
            .await
            .unwrap();

        assert!(response.expanded);
    }

    #[tokio::test]
    async fn test_threshold_and_limit_reach_the_filter() {
        let (engine, embeddings) = engine_with(vec![], Arc::new(FailingGeneration));

        engine
            .search(
                "email template",
                &SearchOptions {
                    expand: false,
                    limit: Some(7),
                },
            )
            .await
            .unwrap();

        let filter = embeddings.seen_filter.lock().unwrap().clone().unwrap();
        assert_eq!(filter.threshold, SEARCH_SIMILARITY_THRESHOLD);
        assert_eq!(filter.limit, 7);
        assert!(filter.include_unlisted);
        assert!(filter.same_type.is_none());
    }

    #[tokio::test]
    async fn test_is_available_requires_flag() {
        let (mut engine, _) = engine_with(vec![], Arc::new(FailingGeneration));
        assert!(engine.is_available());
        engine.flags = FeatureFlags::default().with_ai_search(false);
        assert!(!engine.is_available());
    }

    #[test]
    fn test_group_by_category_counts_and_order() {
        let hits = vec![
            hit(Some("Writing"), 0.9),
            hit(None, 0.8),
            hit(Some("Coding"), 0.7),
            hit(Some("Coding"), 0.6),
        ];
        let groups = group_by_category(&hits);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].category, "Coding");
        assert_eq!(groups[0].results.len(), 2);
        // Tie between Writing and Uncategorized keeps first-seen order.
        assert_eq!(groups[1].category, "Writing");
        assert_eq!(groups[2].category, UNCATEGORIZED);
    }

    #[test]
    fn test_group_by_category_empty() {
        assert!(group_by_category(&[]).is_empty());
    }
}
