//! Prompt read projections: metadata, hit hydration, substring fallback.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use promptmesh_core::defaults::FALLBACK_SIMILARITY;
use promptmesh_core::{
    Error, PromptMeta, PromptRepository, PromptType, Result, SearchHit, SimilarMatch,
};

use crate::escape_like;

/// PostgreSQL implementation of PromptRepository.
pub struct PgPromptRepository {
    pool: Pool<Postgres>,
}

impl PgPromptRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn row_to_hit(row: &sqlx::postgres::PgRow, similarity: f64) -> Result<SearchHit> {
        let type_str: String = row.get("type");
        let tags_str: String = row.get("tags");
        let tags = if tags_str.is_empty() {
            Vec::new()
        } else {
            tags_str.split(',').map(String::from).collect()
        };

        Ok(SearchHit {
            id: row.get("id"),
            slug: row.get("slug"),
            title: row.get("title"),
            description: row.get("description"),
            content: row.get("content"),
            prompt_type: type_str.parse::<PromptType>()?,
            author_name: row.get("author_name"),
            category_name: row.get("category_name"),
            tags,
            vote_count: row.get("vote_count"),
            similarity,
        })
    }
}

/// Shared projection joining author, category, tags, and vote count.
const HIT_PROJECTION: &str = r#"
    SELECT p.id, p.slug, p.title, p.description, p.content, p.type,
           u.name AS author_name,
           c.name AS category_name,
           COALESCE(
               (SELECT string_agg(t.name, ',' ORDER BY t.name)
                FROM prompt_tag pt JOIN tag t ON t.id = pt.tag_id
                WHERE pt.prompt_id = p.id),
               ''
           ) AS tags,
           (SELECT count(*) FROM vote v WHERE v.prompt_id = p.id) AS vote_count
    FROM prompt p
    LEFT JOIN app_user u ON u.id = p.author_id
    LEFT JOIN category c ON c.id = p.category_id
"#;

#[async_trait]
impl PromptRepository for PgPromptRepository {
    async fn get_meta(&self, id: Uuid) -> Result<Option<PromptMeta>> {
        let row = sqlx::query(
            r#"
            SELECT id, slug, title, description, content, type,
                   is_private, is_unlisted, deleted_at,
                   embedding IS NOT NULL AS has_embedding,
                   created_at, updated_at
            FROM prompt
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let type_str: String = row.get("type");
        Ok(Some(PromptMeta {
            id: row.get("id"),
            slug: row.get("slug"),
            title: row.get("title"),
            description: row.get("description"),
            content: row.get("content"),
            prompt_type: type_str.parse::<PromptType>()?,
            is_private: row.get("is_private"),
            is_unlisted: row.get("is_unlisted"),
            deleted_at: row.get("deleted_at"),
            has_embedding: row.get("has_embedding"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn hydrate_hits(&self, matches: &[SimilarMatch]) -> Result<Vec<SearchHit>> {
        if matches.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<Uuid> = matches.iter().map(|m| m.id).collect();
        let sql = format!("{} WHERE p.id = ANY($1)", HIT_PROJECTION);

        let rows = sqlx::query(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        // Re-assemble in match order; the joined query returns rows in
        // arbitrary order. Matches whose prompt row vanished are dropped.
        let mut by_id = std::collections::HashMap::new();
        for row in &rows {
            let id: Uuid = row.get("id");
            by_id.insert(id, row);
        }

        let mut hits = Vec::with_capacity(matches.len());
        for m in matches {
            if let Some(row) = by_id.get(&m.id) {
                hits.push(Self::row_to_hit(row, m.similarity)?);
            }
        }

        debug!(result_count = hits.len(), "Hydrated search hits");
        Ok(hits)
    }

    async fn substring_search(&self, query: &str, limit: i64) -> Result<Vec<SearchHit>> {
        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            r#"{}
            WHERE p.is_private = FALSE
              AND p.deleted_at IS NULL
              AND (p.title ILIKE $1 OR p.description ILIKE $1 OR p.content ILIKE $1)
            ORDER BY p.created_at DESC
            LIMIT $2
            "#,
            HIT_PROJECTION
        );

        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter()
            .map(|row| Self::row_to_hit(row, FALLBACK_SIMILARITY))
            .collect()
    }

    async fn list_unembedded(&self) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM prompt
            WHERE embedding IS NULL
              AND is_private = FALSE
              AND deleted_at IS NULL
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }

    async fn set_unlisted(&self, id: Uuid, unlisted: bool) -> Result<()> {
        let result = sqlx::query("UPDATE prompt SET is_unlisted = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(unlisted)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::PromptNotFound(id));
        }
        Ok(())
    }
}
