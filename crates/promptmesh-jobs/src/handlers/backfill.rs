//! Handler that embeds every public prompt still missing an embedding.
//!
//! Runs sequentially with a fixed delay between provider calls so a large
//! backlog never bursts the embedding API. Per-item failures are counted
//! and skipped; the job itself only fails when listing candidates does.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, warn};

use promptmesh_core::defaults::BACKFILL_DELAY_MS;
use promptmesh_core::{
    EmbedMode, EmbeddingBackend, EmbeddingRepository, JobType, PromptMeta, PromptRepository,
};

use crate::handler::{JobContext, JobHandler, JobResult};

pub struct BackfillHandler {
    prompts: Arc<dyn PromptRepository>,
    embeddings: Arc<dyn EmbeddingRepository>,
    embedder: Arc<dyn EmbeddingBackend>,
}

impl BackfillHandler {
    pub fn new(
        prompts: Arc<dyn PromptRepository>,
        embeddings: Arc<dyn EmbeddingRepository>,
        embedder: Arc<dyn EmbeddingBackend>,
    ) -> Self {
        Self {
            prompts,
            embeddings,
            embedder,
        }
    }
}

/// Text representation embedded for a prompt.
fn embedding_text(meta: &PromptMeta) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        meta.title,
        meta.description.as_deref().unwrap_or(""),
        meta.content
    )
}

#[async_trait]
impl JobHandler for BackfillHandler {
    fn job_type(&self) -> JobType {
        JobType::EmbedBackfill
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        if !self.embedder.is_configured() {
            return JobResult::Failed("Embedding backend is not configured".to_string());
        }

        let ids = match self.prompts.list_unembedded().await {
            Ok(ids) => ids,
            Err(err) => return JobResult::Retry(err.to_string()),
        };

        let total = ids.len();
        let mut embedded = 0usize;
        let mut failed = 0usize;
        let mut skipped = 0usize;

        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                sleep(Duration::from_millis(BACKFILL_DELAY_MS)).await;
            }

            let meta = match self.prompts.get_meta(*id).await {
                Ok(Some(meta)) if meta.is_searchable() => meta,
                Ok(_) => {
                    skipped += 1;
                    continue;
                }
                Err(err) => {
                    warn!(prompt_id = %id, error = %err, "Failed to load prompt, skipping");
                    failed += 1;
                    continue;
                }
            };

            let outcome = async {
                let vector = self
                    .embedder
                    .embed(&embedding_text(&meta), EmbedMode::Document)
                    .await?;
                self.embeddings.upsert(*id, &vector).await
            }
            .await;

            match outcome {
                Ok(()) => {
                    embedded += 1;
                    debug!(prompt_id = %id, "Embedded prompt");
                }
                Err(err) => {
                    failed += 1;
                    warn!(prompt_id = %id, error = %err, "Failed to embed prompt");
                }
            }

            let percent = ((i + 1) * 100 / total.max(1)) as i32;
            ctx.report_progress(percent, Some(&format!("{}/{}", i + 1, total)));
        }

        JobResult::Success(Some(json!({
            "total": total,
            "embedded": embedded,
            "failed": failed,
            "skipped": skipped,
        })))
    }
}
