//! Core data models for promptmesh.
//!
//! These types are shared across all promptmesh crates and represent the
//! domain entities: prompts, search projections, relatedness edges, the
//! prompt-builder draft state, and background jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// PROMPT TYPES
// =============================================================================

/// Output modality of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PromptType {
    Text,
    Image,
    Video,
    Audio,
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PromptType::Text => "TEXT",
            PromptType::Image => "IMAGE",
            PromptType::Video => "VIDEO",
            PromptType::Audio => "AUDIO",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PromptType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TEXT" => Ok(PromptType::Text),
            "IMAGE" => Ok(PromptType::Image),
            "VIDEO" => Ok(PromptType::Video),
            "AUDIO" => Ok(PromptType::Audio),
            other => Err(Error::InvalidInput(format!(
                "Unknown prompt type: {}",
                other
            ))),
        }
    }
}

/// Metadata for a prompt, without joined relations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMeta {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub prompt_type: PromptType,
    pub is_private: bool,
    pub is_unlisted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Whether an embedding has been computed and stored for this prompt.
    pub has_embedding: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PromptMeta {
    /// True if searches and relatedness indexing may surface this prompt.
    pub fn is_searchable(&self) -> bool {
        !self.is_private && self.deleted_at.is_none()
    }
}

// =============================================================================
// SEARCH TYPES
// =============================================================================

/// A raw similarity match from the vector store: prompt id + cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarMatch {
    pub id: Uuid,
    pub similarity: f64,
}

/// A fully hydrated search result: prompt projection plus joined metadata.
///
/// Fallback substring hits carry the fixed similarity sentinel `1.0` since
/// they have no real similarity semantic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub prompt_type: PromptType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub tags: Vec<String>,
    pub vote_count: i64,
    pub similarity: f64,
}

/// Search hits grouped under one category name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
    pub category: String,
    pub results: Vec<SearchHit>,
}

/// Complete response from the semantic search orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub grouped_by_category: Vec<CategoryGroup>,
    /// True only when the retrieval string actually differs from the input.
    pub expanded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded_query: Option<String>,
}

// =============================================================================
// RELATEDNESS TYPES
// =============================================================================

/// Label under which similarity-derived edges are namespaced.
pub const RELATED_EDGE_LABEL: &str = "related";

/// Directed, ordered, label-namespaced adjacency between two prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedEdge {
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub label: String,
    /// 0-based rank of the target among the source's neighbors.
    pub position: i32,
}

// =============================================================================
// IMPROVEMENT TYPES
// =============================================================================

/// Request to the retrieval-augmented improvement service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImproveRequest {
    pub content: String,
    pub output_type: PromptType,
    pub output_format: String,
}

/// Exemplar surfaced alongside an improvement, with its similarity as a
/// rounded integer percentage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspiration {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub similarity: i32,
}

/// Result of the improvement service, including the model identifier used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Improvement {
    pub improved: String,
    pub inspirations: Vec<Inspiration>,
    pub model: String,
}

// =============================================================================
// QUALITY CHECK TYPES
// =============================================================================

/// Verdict from the content quality checker.
///
/// `listed` stays true unless the model is confidently negative; every
/// uncertain or failed path keeps the prompt listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub listed: bool,
    pub confidence: f64,
    pub reason: String,
}

// =============================================================================
// DRAFT STATE (prompt builder)
// =============================================================================

/// In-memory, per-conversation draft of a prompt being built through the
/// agent loop. Mutated only through named tool operations; the caller owns
/// continuity across HTTP calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftState {
    pub title: String,
    pub description: String,
    pub content: String,
    pub prompt_type: Option<PromptType>,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub is_private: bool,
}

/// Category name/id pair supplied by the caller as a tool whitelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

/// Tag name/id pair supplied by the caller as a tool whitelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: Uuid,
    pub name: String,
}

// =============================================================================
// JOB TYPES
// =============================================================================

/// Type of background job to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Recompute the relatedness edges for one prompt
    RelatednessIndex,
    /// Embed every public prompt that lacks an embedding
    EmbedBackfill,
    /// Run the AI quality check against one prompt
    QualityCheck,
}

impl JobType {
    /// Default queue priority for this job type (lower runs first).
    pub fn default_priority(&self) -> i32 {
        match self {
            JobType::RelatednessIndex => 5,
            JobType::QualityCheck => 5,
            JobType::EmbedBackfill => 10,
        }
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A queued background job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub prompt_id: Option<Uuid>,
    pub job_type: JobType,
    pub status: JobStatus,
    pub priority: i32,
    pub payload: Option<JsonValue>,
    pub result: Option<JsonValue>,
    pub error_message: Option<String>,
    pub progress_percent: i32,
    pub progress_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Queue statistics summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub running: i64,
    pub completed_last_hour: i64,
    pub failed_last_hour: i64,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_type_display() {
        assert_eq!(PromptType::Text.to_string(), "TEXT");
        assert_eq!(PromptType::Image.to_string(), "IMAGE");
        assert_eq!(PromptType::Video.to_string(), "VIDEO");
        assert_eq!(PromptType::Audio.to_string(), "AUDIO");
    }

    #[test]
    fn test_prompt_type_from_str() {
        assert_eq!("TEXT".parse::<PromptType>().unwrap(), PromptType::Text);
        assert_eq!("image".parse::<PromptType>().unwrap(), PromptType::Image);
        assert_eq!("Video".parse::<PromptType>().unwrap(), PromptType::Video);
        assert_eq!("AUDIO".parse::<PromptType>().unwrap(), PromptType::Audio);
    }

    #[test]
    fn test_prompt_type_from_str_unknown() {
        assert!("HOLOGRAM".parse::<PromptType>().is_err());
        assert!("".parse::<PromptType>().is_err());
    }

    #[test]
    fn test_prompt_type_serde_round_trip() {
        for pt in [
            PromptType::Text,
            PromptType::Image,
            PromptType::Video,
            PromptType::Audio,
        ] {
            let json = serde_json::to_string(&pt).unwrap();
            let back: PromptType = serde_json::from_str(&json).unwrap();
            assert_eq!(pt, back);
        }
    }

    #[test]
    fn test_prompt_type_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&PromptType::Text).unwrap(),
            "\"TEXT\""
        );
    }

    #[test]
    fn test_is_searchable() {
        let mut meta = PromptMeta {
            id: Uuid::nil(),
            slug: "s".into(),
            title: "t".into(),
            description: None,
            content: "c".into(),
            prompt_type: PromptType::Text,
            is_private: false,
            is_unlisted: false,
            deleted_at: None,
            has_embedding: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(meta.is_searchable());

        meta.is_private = true;
        assert!(!meta.is_searchable());

        meta.is_private = false;
        meta.deleted_at = Some(Utc::now());
        assert!(!meta.is_searchable());
    }

    #[test]
    fn test_draft_state_camel_case_wire_format() {
        let state = DraftState {
            title: "T".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("promptType").is_some());
        assert!(json.get("categoryId").is_some());
        assert!(json.get("tagIds").is_some());
        assert!(json.get("isPrivate").is_some());
    }

    #[test]
    fn test_search_hit_type_field_rename() {
        let hit = SearchHit {
            id: Uuid::nil(),
            slug: "s".into(),
            title: "t".into(),
            description: None,
            content: "c".into(),
            prompt_type: PromptType::Text,
            author_name: None,
            category_name: None,
            tags: vec![],
            vote_count: 0,
            similarity: 0.5,
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["type"], "TEXT");
        assert_eq!(json["voteCount"], 0);
    }

    #[test]
    fn test_job_type_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobType::RelatednessIndex).unwrap(),
            "\"relatedness_index\""
        );
        assert_eq!(
            serde_json::to_string(&JobType::EmbedBackfill).unwrap(),
            "\"embed_backfill\""
        );
    }

    #[test]
    fn test_job_type_default_priority_ordering() {
        // Backfill is bulk work and must not starve per-prompt jobs.
        assert!(
            JobType::EmbedBackfill.default_priority()
                > JobType::RelatednessIndex.default_priority()
        );
    }
}
