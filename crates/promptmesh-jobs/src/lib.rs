//! # promptmesh-jobs
//!
//! Background job queue system for promptmesh:
//! - Priority-based job queueing with deduplication
//! - Async job processing with concurrent workers
//! - Progress tracking and notifications via broadcast channels
//! - Retry logic with configurable limits
//!
//! ## Example
//!
//! ```ignore
//! use promptmesh_jobs::{WorkerBuilder, WorkerConfig, NoOpHandler};
//! use promptmesh_db::Database;
//! use promptmesh_core::JobType;
//!
//! let db = Database::connect("postgres://...").await?;
//!
//! let worker = WorkerBuilder::new(db)
//!     .with_config(WorkerConfig::from_env())
//!     .with_handler(NoOpHandler::new(JobType::EmbedBackfill))
//!     .build()
//!     .await;
//!
//! let handle = worker.start();
//! // ...
//! handle.shutdown().await?;
//! ```

pub mod handler;
pub mod handlers;
pub mod worker;

pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler, ProgressCallback};
pub use handlers::{BackfillHandler, QualityHandler, RelatednessHandler};
pub use worker::{JobWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};

/// Default maximum retries for failed jobs.
pub const DEFAULT_MAX_RETRIES: i32 = promptmesh_core::defaults::JOB_MAX_RETRIES;

/// Default polling interval for job processing (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = promptmesh_core::defaults::JOB_POLL_INTERVAL_MS;
