//! Handler that recomputes the related set for one prompt.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use promptmesh_core::JobType;
use promptmesh_search::RelatednessIndexer;

use crate::handler::{JobContext, JobHandler, JobResult};

pub struct RelatednessHandler {
    indexer: Arc<RelatednessIndexer>,
}

impl RelatednessHandler {
    pub fn new(indexer: Arc<RelatednessIndexer>) -> Self {
        Self { indexer }
    }
}

#[async_trait]
impl JobHandler for RelatednessHandler {
    fn job_type(&self) -> JobType {
        JobType::RelatednessIndex
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let prompt_id = match ctx.prompt_id() {
            Some(id) => id,
            None => return JobResult::Failed("Relatedness job has no prompt id".to_string()),
        };

        match self.indexer.index(prompt_id).await {
            Ok(written) => JobResult::Success(Some(json!({ "related_count": written }))),
            Err(err) => JobResult::Retry(err.to_string()),
        }
    }
}
