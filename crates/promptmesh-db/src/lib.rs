//! # promptmesh-db
//!
//! PostgreSQL database layer for promptmesh.
//!
//! This crate provides:
//! - Connection pool management
//! - Prompt read projections (hit hydration, substring fallback)
//! - Embedding storage and pgvector cosine-similarity retrieval
//! - Relatedness edge persistence
//! - The background job queue
//!
//! ## Example
//!
//! ```rust,ignore
//! use promptmesh_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/promptmesh").await?;
//!     let meta = db.prompts.get_meta(some_id).await?;
//!     Ok(())
//! }
//! ```

pub mod edges;
pub mod embeddings;
pub mod jobs;
pub mod pool;
pub mod prompts;

// Re-export core types
pub use promptmesh_core::*;

pub use edges::PgEdgeRepository;
pub use embeddings::PgEmbeddingRepository;
pub use jobs::PgJobRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use prompts::PgPromptRepository;

use std::sync::Arc;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Database facade bundling every repository over one connection pool.
#[derive(Clone)]
pub struct Database {
    pool: sqlx::Pool<sqlx::Postgres>,
    /// Prompt read projections.
    pub prompts: Arc<PgPromptRepository>,
    /// Embedding storage and similarity retrieval.
    pub embeddings: Arc<PgEmbeddingRepository>,
    /// Relatedness edge repository.
    pub edges: Arc<PgEdgeRepository>,
    /// Job queue repository.
    pub jobs: Arc<PgJobRepository>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            prompts: Arc::new(PgPromptRepository::new(pool.clone())),
            embeddings: Arc::new(PgEmbeddingRepository::new(pool.clone())),
            edges: Arc::new(PgEdgeRepository::new(pool.clone())),
            jobs: Arc::new(PgJobRepository::new(pool.clone())),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
