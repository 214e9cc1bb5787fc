//! Embedding storage and vector similarity retrieval.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use promptmesh_core::{
    EmbeddingRepository, Error, Result, SimilarMatch, SimilarityFilter,
};

/// PostgreSQL + pgvector implementation of EmbeddingRepository.
///
/// One embedding per prompt, stored in a vector column on the prompt row.
/// Similarity is cosine: `1.0 - (embedding <=> query)`.
pub struct PgEmbeddingRepository {
    pool: Pool<Postgres>,
}

impl PgEmbeddingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Compile a [`SimilarityFilter`] into WHERE clauses.
///
/// Clause text is static; filter values are bound as parameters starting at
/// `$first_param`. Returns the clauses and the next free parameter index.
/// Visibility predicates (embedding present, not private, not deleted) are
/// always emitted and cannot be disabled through the filter.
fn build_filter_clauses(filter: &SimilarityFilter, first_param: usize) -> (Vec<String>, usize) {
    let mut clauses = vec![
        "p.embedding IS NOT NULL".to_string(),
        "p.is_private = FALSE".to_string(),
        "p.deleted_at IS NULL".to_string(),
    ];
    let mut next = first_param;

    if !filter.include_unlisted {
        clauses.push("p.is_unlisted = FALSE".to_string());
    }

    if filter.exclude_id.is_some() {
        clauses.push(format!("p.id <> ${}", next));
        next += 1;
    }

    if filter.same_type.is_some() {
        clauses.push(format!("p.type = ${}", next));
        next += 1;
    }

    (clauses, next)
}

#[async_trait]
impl EmbeddingRepository for PgEmbeddingRepository {
    async fn upsert(&self, prompt_id: Uuid, vector: &Vector) -> Result<()> {
        let result = sqlx::query(
            "UPDATE prompt SET embedding = $2, updated_at = now() WHERE id = $1",
        )
        .bind(prompt_id)
        .bind(vector)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::PromptNotFound(prompt_id));
        }
        Ok(())
    }

    async fn get(&self, prompt_id: Uuid) -> Result<Option<Vector>> {
        let row = sqlx::query("SELECT embedding FROM prompt WHERE id = $1")
            .bind(prompt_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.and_then(|r| r.get::<Option<Vector>, _>("embedding")))
    }

    async fn top_k_similar(
        &self,
        query: &Vector,
        filter: &SimilarityFilter,
    ) -> Result<Vec<SimilarMatch>> {
        // $1 = query vector, $2 = threshold, then filter params, then limit.
        let (clauses, next) = build_filter_clauses(filter, 3);

        let sql = format!(
            r#"
            SELECT p.id,
                   1.0 - (p.embedding <=> $1::vector) AS similarity
            FROM prompt p
            WHERE {}
              AND 1.0 - (p.embedding <=> $1::vector) >= $2
            ORDER BY p.embedding <=> $1::vector
            LIMIT ${}
            "#,
            clauses.join("\n              AND "),
            next,
        );

        let mut q = sqlx::query(&sql).bind(query).bind(filter.threshold);
        if let Some(exclude_id) = filter.exclude_id {
            q = q.bind(exclude_id);
        }
        if let Some(prompt_type) = filter.same_type {
            q = q.bind(prompt_type.to_string());
        }
        q = q.bind(filter.limit);

        let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;

        let matches: Vec<SimilarMatch> = rows
            .into_iter()
            .map(|row| SimilarMatch {
                id: row.get("id"),
                similarity: row.get::<f64, _>("similarity"),
            })
            .collect();

        debug!(
            result_count = matches.len(),
            threshold = filter.threshold,
            "Similarity query complete"
        );
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptmesh_core::PromptType;

    #[test]
    fn test_base_clauses_always_present() {
        let filter = SimilarityFilter::new(0.4, 20);
        let (clauses, next) = build_filter_clauses(&filter, 3);
        assert!(clauses.contains(&"p.embedding IS NOT NULL".to_string()));
        assert!(clauses.contains(&"p.is_private = FALSE".to_string()));
        assert!(clauses.contains(&"p.deleted_at IS NULL".to_string()));
        // No optional predicates: next free parameter is unchanged.
        assert_eq!(next, 3);
    }

    #[test]
    fn test_unlisted_clause_for_relatedness() {
        let filter = SimilarityFilter::new(0.5, 4).include_unlisted(false);
        let (clauses, next) = build_filter_clauses(&filter, 3);
        assert!(clauses.contains(&"p.is_unlisted = FALSE".to_string()));
        // No parameter consumed for the unlisted predicate.
        assert_eq!(next, 3);
    }

    #[test]
    fn test_exclude_id_consumes_parameter() {
        let filter = SimilarityFilter::new(0.5, 4).exclude_id(Uuid::nil());
        let (clauses, next) = build_filter_clauses(&filter, 3);
        assert!(clauses.contains(&"p.id <> $3".to_string()));
        assert_eq!(next, 4);
    }

    #[test]
    fn test_same_type_after_exclude_id() {
        let filter = SimilarityFilter::new(0.5, 4)
            .exclude_id(Uuid::nil())
            .same_type(PromptType::Text);
        let (clauses, next) = build_filter_clauses(&filter, 3);
        assert!(clauses.contains(&"p.id <> $3".to_string()));
        assert!(clauses.contains(&"p.type = $4".to_string()));
        assert_eq!(next, 5);
    }

    #[test]
    fn test_same_type_alone() {
        let filter = SimilarityFilter::new(0.4, 20).same_type(PromptType::Image);
        let (clauses, next) = build_filter_clauses(&filter, 3);
        assert!(clauses.contains(&"p.type = $3".to_string()));
        assert_eq!(next, 4);
    }

    #[test]
    fn test_full_relatedness_filter_shape() {
        let filter = SimilarityFilter::new(0.5, 4)
            .exclude_id(Uuid::nil())
            .same_type(PromptType::Text)
            .include_unlisted(false);
        let (clauses, next) = build_filter_clauses(&filter, 3);
        assert_eq!(clauses.len(), 6);
        assert_eq!(next, 5);
    }
}
