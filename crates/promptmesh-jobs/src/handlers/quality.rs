//! Handler that runs the quality check for one prompt and delists it on a
//! confidently negative verdict.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use promptmesh_core::{JobType, PromptRepository};
use promptmesh_search::QualityChecker;

use crate::handler::{JobContext, JobHandler, JobResult};

pub struct QualityHandler {
    prompts: Arc<dyn PromptRepository>,
    checker: Arc<QualityChecker>,
}

impl QualityHandler {
    pub fn new(prompts: Arc<dyn PromptRepository>, checker: Arc<QualityChecker>) -> Self {
        Self { prompts, checker }
    }
}

#[async_trait]
impl JobHandler for QualityHandler {
    fn job_type(&self) -> JobType {
        JobType::QualityCheck
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let prompt_id = match ctx.prompt_id() {
            Some(id) => id,
            None => return JobResult::Failed("Quality job has no prompt id".to_string()),
        };

        let meta = match self.prompts.get_meta(prompt_id).await {
            Ok(Some(meta)) => meta,
            Ok(None) => {
                return JobResult::Success(Some(json!({ "skipped": "prompt vanished" })));
            }
            Err(err) => return JobResult::Retry(err.to_string()),
        };

        let verdict = self.checker.check(&meta).await;

        if !verdict.listed {
            if let Err(err) = self.prompts.set_unlisted(prompt_id, true).await {
                return JobResult::Retry(err.to_string());
            }
            info!(
                prompt_id = %prompt_id,
                confidence = verdict.confidence,
                reason = %verdict.reason,
                "Prompt delisted by quality check"
            );
        }

        JobResult::Success(Some(json!({
            "listed": verdict.listed,
            "confidence": verdict.confidence,
            "reason": verdict.reason,
        })))
    }
}
