//! Content quality checking.
//!
//! Decides whether a prompt stays publicly listed. Trivially thin content is
//! delisted deterministically; otherwise a model verdict is requested and
//! honored only when it is confidently negative. Every failure path keeps
//! the prompt listed.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use promptmesh_core::defaults::{
    QUALITY_CONFIDENCE_FLOOR, QUALITY_MIN_CHARS, QUALITY_MIN_WORDS,
};
use promptmesh_core::{GenerationBackend, PromptMeta, QualityVerdict};

const QUALITY_SYSTEM: &str = r#"You are a content quality reviewer for a prompt library. Judge whether the submitted prompt is a genuine, usable prompt (not spam, gibberish, placeholder text, or trivial filler).

Respond with ONLY a JSON object, no prose:
{"quality_ok": true|false, "confidence": 0.0-1.0, "reason": "one short sentence"}"#;

/// Raw model verdict shape. Parsed strictly; anything else fails open.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    quality_ok: bool,
    confidence: f64,
    reason: String,
}

/// Fail-open quality checker.
pub struct QualityChecker {
    generator: Arc<dyn GenerationBackend>,
}

impl QualityChecker {
    pub fn new(generator: Arc<dyn GenerationBackend>) -> Self {
        Self { generator }
    }

    /// Evaluate one prompt. Never returns an error: uncertainty keeps the
    /// prompt listed.
    pub async fn check(&self, meta: &PromptMeta) -> QualityVerdict {
        if let Some(verdict) = thin_content_verdict(&meta.content) {
            return verdict;
        }

        if !self.generator.is_configured() {
            return listed_verdict(0.0, "Quality model not configured");
        }

        let user = format!("Title: {}\n\nPrompt:\n{}", meta.title, meta.content);
        let raw = match self.generator.generate_with_system(QUALITY_SYSTEM, &user).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, prompt_id = %meta.id, "Quality check failed, keeping listed");
                return listed_verdict(0.0, "Quality check unavailable");
            }
        };

        match parse_verdict(&raw) {
            Some(verdict) => {
                debug!(
                    prompt_id = %meta.id,
                    listed = verdict.listed,
                    confidence = verdict.confidence,
                    "Quality verdict"
                );
                verdict
            }
            None => {
                warn!(prompt_id = %meta.id, "Unparseable quality verdict, keeping listed");
                listed_verdict(0.0, "Unparseable quality verdict")
            }
        }
    }
}

/// Deterministic verdict for content too thin to bother the model with.
fn thin_content_verdict(content: &str) -> Option<QualityVerdict> {
    let trimmed = content.trim();
    let chars = trimmed.chars().count();
    let words = trimmed.split_whitespace().count();
    if chars < QUALITY_MIN_CHARS || words < QUALITY_MIN_WORDS {
        Some(QualityVerdict {
            listed: false,
            confidence: 1.0,
            reason: "Content too short to be a usable prompt".to_string(),
        })
    } else {
        None
    }
}

/// Strict parse of the model's JSON verdict. A negative verdict delists
/// only above the confidence floor.
fn parse_verdict(raw: &str) -> Option<QualityVerdict> {
    let raw: RawVerdict = serde_json::from_str(raw.trim()).ok()?;
    if !(0.0..=1.0).contains(&raw.confidence) {
        return None;
    }
    let delist = !raw.quality_ok && raw.confidence >= QUALITY_CONFIDENCE_FLOOR;
    Some(QualityVerdict {
        listed: !delist,
        confidence: raw.confidence,
        reason: raw.reason,
    })
}

fn listed_verdict(confidence: f64, reason: &str) -> QualityVerdict {
    QualityVerdict {
        listed: true,
        confidence,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use promptmesh_core::{Error, PromptType, Result};
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    fn meta(content: &str) -> PromptMeta {
        PromptMeta {
            id: Uuid::new_v4(),
            slug: "p".to_string(),
            title: "P".to_string(),
            description: None,
            content: content.to_string(),
            prompt_type: PromptType::Text,
            is_private: false,
            is_unlisted: false,
            deleted_at: None,
            has_embedding: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn substantial_content() -> String {
        "Write a thorough project status report covering progress risks and next steps for stakeholders this week".to_string()
    }

    struct StubGenerator {
        response: Result<String>,
        called: AtomicBool,
    }

    impl StubGenerator {
        fn responding(text: &str) -> Self {
            Self {
                response: Ok(text.to_string()),
                called: AtomicBool::new(false),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(Error::Provider {
                    status: 500,
                    body: "boom".to_string(),
                }),
                called: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for StubGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.generate_with_system("", "").await
        }

        async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
            self.called.store(true, Ordering::SeqCst);
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(Error::Provider {
                    status: 500,
                    body: "boom".to_string(),
                }),
            }
        }

        fn model_name(&self) -> &str {
            "stub-gen"
        }
    }

    #[tokio::test]
    async fn test_thin_content_delisted_without_model_call() {
        let generator = Arc::new(StubGenerator::responding("unused"));
        let checker = QualityChecker::new(generator.clone());

        let verdict = checker.check(&meta("too short")).await;
        assert!(!verdict.listed);
        assert_eq!(verdict.confidence, 1.0);
        assert!(!generator.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_confident_negative_verdict_delists() {
        let checker = QualityChecker::new(Arc::new(StubGenerator::responding(
            r#"{"quality_ok": false, "confidence": 0.95, "reason": "Gibberish"}"#,
        )));

        let verdict = checker.check(&meta(&substantial_content())).await;
        assert!(!verdict.listed);
        assert_eq!(verdict.reason, "Gibberish");
    }

    #[tokio::test]
    async fn test_uncertain_negative_verdict_stays_listed() {
        let checker = QualityChecker::new(Arc::new(StubGenerator::responding(
            r#"{"quality_ok": false, "confidence": 0.6, "reason": "Maybe spam"}"#,
        )));

        let verdict = checker.check(&meta(&substantial_content())).await;
        assert!(verdict.listed);
        assert_eq!(verdict.confidence, 0.6);
    }

    #[tokio::test]
    async fn test_positive_verdict_stays_listed() {
        let checker = QualityChecker::new(Arc::new(StubGenerator::responding(
            r#"{"quality_ok": true, "confidence": 0.9, "reason": "Solid prompt"}"#,
        )));

        let verdict = checker.check(&meta(&substantial_content())).await;
        assert!(verdict.listed);
    }

    #[tokio::test]
    async fn test_provider_error_fails_open() {
        let checker = QualityChecker::new(Arc::new(StubGenerator::failing()));

        let verdict = checker.check(&meta(&substantial_content())).await;
        assert!(verdict.listed);
    }

    #[tokio::test]
    async fn test_unparseable_verdict_fails_open() {
        let checker = QualityChecker::new(Arc::new(StubGenerator::responding(
            "Sure! Here is my assessment: it looks fine.",
        )));

        let verdict = checker.check(&meta(&substantial_content())).await;
        assert!(verdict.listed);
    }

    #[test]
    fn test_parse_rejects_out_of_range_confidence() {
        assert!(parse_verdict(r#"{"quality_ok": false, "confidence": 1.5, "reason": "x"}"#).is_none());
    }

    #[test]
    fn test_thin_content_word_floor() {
        // Over the char floor but under the word floor.
        let content = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa four words only";
        assert!(thin_content_verdict(content).is_some());
    }
}
