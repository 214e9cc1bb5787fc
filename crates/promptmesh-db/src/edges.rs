//! Relatedness edge repository.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use promptmesh_core::{EdgeRepository, Error, Result};

/// PostgreSQL implementation of EdgeRepository.
pub struct PgEdgeRepository {
    pool: Pool<Postgres>,
}

impl PgEdgeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EdgeRepository for PgEdgeRepository {
    async fn replace_for_source(
        &self,
        source_id: Uuid,
        label: &str,
        targets: &[Uuid],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM prompt_edge WHERE source_id = $1 AND label = $2")
            .bind(source_id)
            .bind(label)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        for (position, target_id) in targets.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO prompt_edge (id, source_id, target_id, label, position)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (source_id, target_id, label) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(source_id)
            .bind(target_id)
            .bind(label)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            source_id = %source_id,
            label = label,
            result_count = targets.len(),
            "Replaced edges"
        );
        Ok(())
    }

    async fn delete_for_source(&self, source_id: Uuid, label: &str) -> Result<()> {
        sqlx::query("DELETE FROM prompt_edge WHERE source_id = $1 AND label = $2")
            .bind(source_id)
            .bind(label)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn targets_for_source(&self, source_id: Uuid, label: &str) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT target_id FROM prompt_edge
            WHERE source_id = $1 AND label = $2
            ORDER BY position
            "#,
        )
        .bind(source_id)
        .bind(label)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|row| row.get("target_id")).collect())
    }
}
