//! Retrieval-augmented prompt improvement.
//!
//! Retrieves a handful of similar, same-type prompts as in-context
//! exemplars, then asks the model to rewrite the draft using them plus a
//! type-system reference.

use std::sync::Arc;

use tracing::{debug, info};

use promptmesh_core::defaults::{
    EXEMPLAR_LIMIT, EXEMPLAR_SIMILARITY_THRESHOLD, EXEMPLAR_SNIPPET_CHARS,
};
use promptmesh_core::{
    EmbedMode, EmbeddingBackend, EmbeddingRepository, Error, GenerationBackend, Improvement,
    ImproveRequest, Inspiration, PromptRepository, Result, SearchHit, SimilarityFilter,
};

/// Static reference describing valid output-type/output-format combinations,
/// interpolated into the system instruction.
const TYPE_REFERENCE: &str = r#"Output types and their formats:
- TEXT: written responses (articles, emails, code, analysis). Formats: plain text, structured JSON, structured YAML.
- IMAGE: image-generation prompts describing subject, style, composition, and lighting. Format: plain text.
- VIDEO: video-generation prompts describing scene, motion, camera work, and duration. Format: plain text.
- AUDIO: audio-generation prompts describing sound, voice, mood, and pacing. Format: plain text."#;

const SYSTEM_TEMPLATE: &str = r#"You are an expert prompt engineer. Improve the user's draft prompt: make it specific, well-structured, and effective, while preserving its intent.

Use these similar prompts from the library as inspiration for tone and structure (do not copy them):

{similar_prompts}

{type_reference}

Return ONLY the improved prompt text, with no preamble or commentary."#;

/// Retrieval-augmented improvement service.
pub struct ImprovementService {
    prompts: Arc<dyn PromptRepository>,
    embeddings: Arc<dyn EmbeddingRepository>,
    embedder: Arc<dyn EmbeddingBackend>,
    generator: Arc<dyn GenerationBackend>,
}

impl ImprovementService {
    pub fn new(
        prompts: Arc<dyn PromptRepository>,
        embeddings: Arc<dyn EmbeddingRepository>,
        embedder: Arc<dyn EmbeddingBackend>,
        generator: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self {
            prompts,
            embeddings,
            embedder,
            generator,
        }
    }

    /// Improve a draft prompt using retrieved exemplars.
    ///
    /// Fails with a configuration error before any retrieval when the
    /// generation credential is absent.
    pub async fn improve(&self, request: &ImproveRequest) -> Result<Improvement> {
        if !self.generator.is_configured() {
            return Err(Error::Configuration(
                "Generation backend is not configured".to_string(),
            ));
        }

        let exemplars = self.find_exemplars(request).await?;
        debug!(result_count = exemplars.len(), "Retrieved exemplars");

        let system = build_system_instruction(&exemplars);
        let user_prompt = format!(
            "Output type: {}\nOutput format: {}\n\nOriginal prompt:\n{}",
            request.output_type, request.output_format, request.content
        );

        let improved = self
            .generator
            .generate_with_system(&system, &user_prompt)
            .await?;
        let improved = improved.trim().to_string();

        if improved.is_empty() {
            return Err(Error::EmptyGeneration);
        }

        let inspirations: Vec<Inspiration> = exemplars
            .iter()
            .map(|hit| Inspiration {
                id: hit.id,
                slug: hit.slug.clone(),
                title: hit.title.clone(),
                similarity: (hit.similarity * 100.0).round() as i32,
            })
            .collect();

        info!(
            model = self.generator.model_name(),
            inspiration_count = inspirations.len(),
            "Improvement complete"
        );

        Ok(Improvement {
            improved,
            inspirations,
            model: self.generator.model_name().to_string(),
        })
    }

    /// Top same-type exemplars above the lenient exemplar threshold.
    /// Exemplar retrieval failing is not fatal to the improvement itself
    /// only when the embedding backend is unconfigured; provider errors
    /// propagate.
    async fn find_exemplars(&self, request: &ImproveRequest) -> Result<Vec<SearchHit>> {
        if !self.embedder.is_configured() {
            return Ok(vec![]);
        }

        let query_vector = self
            .embedder
            .embed(&request.content, EmbedMode::Query)
            .await?;

        let filter = SimilarityFilter::new(EXEMPLAR_SIMILARITY_THRESHOLD, EXEMPLAR_LIMIT)
            .same_type(request.output_type);
        let matches = self.embeddings.top_k_similar(&query_vector, &filter).await?;
        self.prompts.hydrate_hits(&matches).await
    }
}

/// Render the system instruction from exemplar snippets.
fn build_system_instruction(exemplars: &[SearchHit]) -> String {
    let similar_prompts = if exemplars.is_empty() {
        "No similar prompts found for inspiration.".to_string()
    } else {
        exemplars
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                format!(
                    "### Inspiration {}: {}\n{}",
                    i + 1,
                    hit.title,
                    truncate_snippet(&hit.content, EXEMPLAR_SNIPPET_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    SYSTEM_TEMPLATE
        .replace("{similar_prompts}", &similar_prompts)
        .replace("{type_reference}", TYPE_REFERENCE)
}

/// First `max_chars` characters with an ellipsis marker if truncated,
/// respecting char boundaries.
fn truncate_snippet(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pgvector::Vector;
    use promptmesh_core::{PromptMeta, PromptType, SimilarMatch};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    struct StubPrompts;

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
                    slug: "exemplar".to_string(),
                    title: "Exemplar".to_string(),
                    description: None,
                    content: "Great prompt body".to_string(),
                    prompt_type: PromptType::Text,
                    author_name: None,
                    category_name: None,
                    tags: vec![],
                    vote_count: 0,
                    similarity: m.similarity,
                })
                .collect())
        }

        async fn substring_search(&self, _query: &str, _limit: i64) -> Result<Vec<SearchHit>> {
            Ok(vec![])
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

    struct StubEmbedder {
        configured: bool,
        called: AtomicBool,
    }

    #[async_trait]
    impl EmbeddingBackend for StubEmbedder {
        async fn embed(&self, _text: &str, _mode: EmbedMode) -> Result<Vector> {
            self.called.store(true, Ordering::SeqCst);
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

        fn is_configured(&self) -> bool {
            self.configured
        }
    }

    struct StubGenerator {
        configured: bool,
        response: String,
    }

    #[async_trait]
    impl GenerationBackend for StubGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.response.clone())
        }

        async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
            Ok(self.response.clone())
        }

        fn model_name(&self) -> &str {
            "stub-gen"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }
    }

    fn request() -> ImproveRequest {
        ImproveRequest {
            content: "write an email".to_string(),
            output_type: PromptType::Text,
            output_format: "text".to_string(),
        }
    }

    fn service(
        matches: Vec<SimilarMatch>,
        generator: StubGenerator,
        embedder: StubEmbedder,
    ) -> (ImprovementService, Arc<StubEmbeddings>, Arc<StubEmbedder>) {
        let embeddings = Arc::new(StubEmbeddings {
            matches,
            seen_filter: Mutex::new(None),
        });
        let embedder = Arc::new(embedder);
        let svc = ImprovementService::new(
            Arc::new(StubPrompts),
            embeddings.clone(),
            embedder.clone(),
            Arc::new(generator),
        );
        (svc, embeddings, embedder)
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_retrieval() {
        let (svc, _, embedder) = service(
            vec![],
            StubGenerator {
                configured: false,
                response: "unused".to_string(),
            },
            StubEmbedder {
                configured: true,
                called: AtomicBool::new(false),
            },
        );

        let err = svc.improve(&request()).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        // No retrieval happened.
        assert!(!embedder.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_blank_generation_is_empty_generation_error() {
        let (svc, _, _) = service(
            vec![],
            StubGenerator {
                configured: true,
                response: "   \n".to_string(),
            },
            StubEmbedder {
                configured: true,
                called: AtomicBool::new(false),
            },
        );

        let err = svc.improve(&request()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyGeneration));
    }

    #[tokio::test]
    async fn test_inspirations_carry_percentage_similarity() {
        let m = SimilarMatch {
            id: Uuid::new_v4(),
            similarity: 0.678,
        };
        let (svc, _, _) = service(
            vec![m],
            StubGenerator {
                configured: true,
                response: "Improved text".to_string(),
            },
            StubEmbedder {
                configured: true,
                called: AtomicBool::new(false),
            },
        );

        let result = svc.improve(&request()).await.unwrap();
        assert_eq!(result.improved, "Improved text");
        assert_eq!(result.inspirations.len(), 1);
        assert_eq!(result.inspirations[0].similarity, 68);
        assert_eq!(result.model, "stub-gen");
    }

    #[tokio::test]
    async fn test_exemplar_filter_uses_lenient_threshold_and_type() {
        let (svc, embeddings, _) = service(
            vec![],
            StubGenerator {
                configured: true,
                response: "Improved".to_string(),
            },
            StubEmbedder {
                configured: true,
                called: AtomicBool::new(false),
            },
        );

        svc.improve(&request()).await.unwrap();

        let filter = embeddings.seen_filter.lock().unwrap().clone().unwrap();
        assert_eq!(filter.threshold, EXEMPLAR_SIMILARITY_THRESHOLD);
        assert_eq!(filter.limit, EXEMPLAR_LIMIT);
        assert_eq!(filter.same_type, Some(PromptType::Text));
    }

    #[tokio::test]
    async fn test_unconfigured_embedder_improves_without_exemplars() {
        let (svc, _, _) = service(
            vec![],
            StubGenerator {
                configured: true,
                response: "Improved anyway".to_string(),
            },
            StubEmbedder {
                configured: false,
                called: AtomicBool::new(false),
            },
        );

        let result = svc.improve(&request()).await.unwrap();
        assert_eq!(result.improved, "Improved anyway");
        assert!(result.inspirations.is_empty());
    }

    #[test]
    fn test_truncate_snippet_adds_ellipsis() {
        let long = "x".repeat(600);
        let snippet = truncate_snippet(&long, 500);
        assert_eq!(snippet.chars().count(), 503);
        assert!(snippet.ends_with("..."));
    }

    #[test]
    fn test_truncate_snippet_short_content_unchanged() {
        assert_eq!(truncate_snippet("short", 500), "short");
    }

    #[test]
    fn test_system_instruction_lists_exemplars() {
        let exemplar = SearchHit {
            id: Uuid::nil(),
            slug: "s".to_string(),
            title: "Great exemplar".to_string(),
            description: None,
            content: "body".to_string(),
            prompt_type: PromptType::Text,
            author_name: None,
            category_name: None,
            tags: vec![],
            vote_count: 0,
            similarity: 0.5,
        };
        let system = build_system_instruction(&[exemplar]);
        assert!(system.contains("### Inspiration 1: Great exemplar"));
        assert!(system.contains("Output types"));
    }

    #[test]
    fn test_system_instruction_without_exemplars() {
        let system = build_system_instruction(&[]);
        assert!(system.contains("No similar prompts found for inspiration."));
    }
}
