//! Relatedness indexing.
//!
//! Computes the nearest same-type neighbors for a prompt and replaces its
//! `related` edge set wholesale. Runs after create/update via the job queue.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use promptmesh_core::defaults::{RELATED_NEIGHBOR_LIMIT, RELATED_SIMILARITY_THRESHOLD};
use promptmesh_core::{
    EdgeRepository, EmbeddingRepository, FeatureFlags, PromptRepository, Result,
    SimilarityFilter, RELATED_EDGE_LABEL,
};

/// What to do with existing edges when the fresh neighbor set is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnEmpty {
    /// Keep previously indexed edges in place.
    #[default]
    Preserve,
    /// Delete previously indexed edges.
    Clear,
}

#[derive(Debug, Clone)]
pub struct RelatednessConfig {
    pub threshold: f64,
    pub neighbor_limit: i64,
    pub on_empty: OnEmpty,
}

impl Default for RelatednessConfig {
    fn default() -> Self {
        Self {
            threshold: RELATED_SIMILARITY_THRESHOLD,
            neighbor_limit: RELATED_NEIGHBOR_LIMIT,
            on_empty: OnEmpty::Preserve,
        }
    }
}

/// Maintains the `related` edge set for prompts.
pub struct RelatednessIndexer {
    prompts: Arc<dyn PromptRepository>,
    embeddings: Arc<dyn EmbeddingRepository>,
    edges: Arc<dyn EdgeRepository>,
    flags: FeatureFlags,
    config: RelatednessConfig,
}

impl RelatednessIndexer {
    pub fn new(
        prompts: Arc<dyn PromptRepository>,
        embeddings: Arc<dyn EmbeddingRepository>,
        edges: Arc<dyn EdgeRepository>,
        flags: FeatureFlags,
    ) -> Self {
        Self {
            prompts,
            embeddings,
            edges,
            flags,
            config: RelatednessConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RelatednessConfig) -> Self {
        self.config = config;
        self
    }

    /// Recompute and replace the related set for one prompt.
    ///
    /// Skips silently when the feature is disabled, the prompt is gone or
    /// unsearchable, or it has no embedding yet. Returns the number of
    /// neighbors written.
    pub async fn index(&self, prompt_id: Uuid) -> Result<usize> {
        if !self.flags.ai_search {
            debug!(prompt_id = %prompt_id, "Relatedness indexing disabled, skipping");
            return Ok(0);
        }

        let meta = match self.prompts.get_meta(prompt_id).await? {
            Some(meta) => meta,
            None => {
                debug!(prompt_id = %prompt_id, "Prompt vanished before indexing, skipping");
                return Ok(0);
            }
        };
        if !meta.is_searchable() {
            debug!(prompt_id = %prompt_id, "Prompt not searchable, skipping");
            return Ok(0);
        }

        let embedding = match self.embeddings.get(prompt_id).await? {
            Some(vector) => vector,
            None => {
                debug!(prompt_id = %prompt_id, "No embedding stored yet, skipping");
                return Ok(0);
            }
        };

        let filter = SimilarityFilter::new(self.config.threshold, self.config.neighbor_limit)
            .exclude_id(prompt_id)
            .same_type(meta.prompt_type)
            .include_unlisted(false);
        let neighbors = self.embeddings.top_k_similar(&embedding, &filter).await?;

        if neighbors.is_empty() {
            match self.config.on_empty {
                OnEmpty::Preserve => {
                    debug!(prompt_id = %prompt_id, "No neighbors found, preserving existing edges");
                }
                OnEmpty::Clear => {
                    self.edges
                        .delete_for_source(prompt_id, RELATED_EDGE_LABEL)
                        .await?;
                    debug!(prompt_id = %prompt_id, "No neighbors found, cleared existing edges");
                }
            }
            return Ok(0);
        }

        let targets: Vec<Uuid> = neighbors.iter().map(|n| n.id).collect();
        self.edges
            .replace_for_source(prompt_id, RELATED_EDGE_LABEL, &targets)
            .await?;

        info!(
            prompt_id = %prompt_id,
            result_count = targets.len(),
            "Related set replaced"
        );
        Ok(targets.len())
    }
}
