//! Job queue repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use promptmesh_core::{Error, Job, JobRepository, JobStatus, JobType, QueueStats, Result};

/// PostgreSQL implementation of JobRepository.
pub struct PgJobRepository {
    pool: Pool<Postgres>,
}

impl PgJobRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn job_type_to_str(job_type: JobType) -> &'static str {
        match job_type {
            JobType::RelatednessIndex => "relatedness_index",
            JobType::EmbedBackfill => "embed_backfill",
            JobType::QualityCheck => "quality_check",
        }
    }

    fn str_to_job_type(s: &str) -> Result<JobType> {
        match s {
            "relatedness_index" => Ok(JobType::RelatednessIndex),
            "embed_backfill" => Ok(JobType::EmbedBackfill),
            "quality_check" => Ok(JobType::QualityCheck),
            other => Err(Error::Job(format!("Unknown job type: {}", other))),
        }
    }

    fn job_status_to_str(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    fn str_to_job_status(s: &str) -> Result<JobStatus> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::Job(format!("Unknown job status: {}", other))),
        }
    }

    fn parse_job_row(row: sqlx::postgres::PgRow) -> Result<Job> {
        let type_str: String = row.get("job_type");
        let status_str: String = row.get("status");
        Ok(Job {
            id: row.get("id"),
            prompt_id: row.get("prompt_id"),
            job_type: Self::str_to_job_type(&type_str)?,
            status: Self::str_to_job_status(&status_str)?,
            priority: row.get("priority"),
            payload: row.get("payload"),
            result: row.get("result"),
            error_message: row.get("error_message"),
            progress_percent: row.get("progress_percent"),
            progress_message: row.get("progress_message"),
            retry_count: row.get("retry_count"),
            max_retries: row.get("max_retries"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn queue(
        &self,
        prompt_id: Option<Uuid>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Uuid> {
        let job_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO job (id, prompt_id, job_type, status, priority, payload)
            VALUES ($1, $2, $3, 'pending', $4, $5)
            "#,
        )
        .bind(job_id)
        .bind(prompt_id)
        .bind(Self::job_type_to_str(job_type))
        .bind(priority)
        .bind(&payload)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(job_id)
    }

    async fn queue_deduplicated(
        &self,
        prompt_id: Option<Uuid>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Option<Uuid>> {
        let job_id = Uuid::new_v4();

        let result = sqlx::query(
            r#"
            INSERT INTO job (id, prompt_id, job_type, status, priority, payload)
            SELECT $1, $2, $3, 'pending', $4, $5
            WHERE NOT EXISTS (
                SELECT 1 FROM job
                WHERE job_type = $3
                  AND status = 'pending'
                  AND prompt_id IS NOT DISTINCT FROM $2
            )
            "#,
        )
        .bind(job_id)
        .bind(prompt_id)
        .bind(Self::job_type_to_str(job_type))
        .bind(priority)
        .bind(&payload)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            Ok(None)
        } else {
            Ok(Some(job_id))
        }
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let row = sqlx::query(
            r#"
            UPDATE job
            SET status = 'running', started_at = now()
            WHERE id = (
                SELECT id FROM job
                WHERE status = 'pending'
                ORDER BY priority, created_at
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING *
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        percent: i32,
        message: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE job SET progress_percent = $2, progress_message = $3 WHERE id = $1",
        )
        .bind(job_id)
        .bind(percent.clamp(0, 100))
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job
            SET status = 'completed', result = $2, progress_percent = 100,
                completed_at = $3
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(&result)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        // Requeue while retries remain, otherwise park as failed.
        sqlx::query(
            r#"
            UPDATE job
            SET retry_count = retry_count + 1,
                error_message = $2,
                status = CASE
                    WHEN retry_count + 1 < max_retries THEN 'pending'
                    ELSE 'failed'
                END,
                completed_at = CASE
                    WHEN retry_count + 1 < max_retries THEN NULL
                    ELSE $3
                END
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query("SELECT * FROM job WHERE id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn pending_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT count(*) AS n FROM job WHERE status = 'pending'")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.get("n"))
    }

    async fn queue_stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            r#"
            SELECT
                count(*) FILTER (WHERE status = 'pending') AS pending,
                count(*) FILTER (WHERE status = 'running') AS running,
                count(*) FILTER (WHERE status = 'completed'
                                 AND completed_at > now() - interval '1 hour') AS completed_last_hour,
                count(*) FILTER (WHERE status = 'failed'
                                 AND completed_at > now() - interval '1 hour') AS failed_last_hour,
                count(*) AS total
            FROM job
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueStats {
            pending: row.get("pending"),
            running: row.get("running"),
            completed_last_hour: row.get("completed_last_hour"),
            failed_last_hour: row.get("failed_last_hour"),
            total: row.get("total"),
        })
    }
}
