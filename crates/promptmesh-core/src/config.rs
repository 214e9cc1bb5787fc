//! Feature flag configuration consumed (not owned) by the pipeline.

/// Runtime feature flags gating the AI subsystems.
#[derive(Debug, Clone, Copy)]
pub struct FeatureFlags {
    /// Semantic search pipeline (classification, expansion, embedding,
    /// vector retrieval). Off → callers use the substring fallback.
    pub ai_search: bool,
    /// Generation features: improvement, quality check, the agent loop.
    pub ai_generation: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            ai_search: true,
            ai_generation: true,
        }
    }
}

impl FeatureFlags {
    /// Read flags from `AI_SEARCH_ENABLED` / `AI_GENERATION_ENABLED`
    /// (default: enabled).
    pub fn from_env() -> Self {
        Self {
            ai_search: flag_from_env("AI_SEARCH_ENABLED", true),
            ai_generation: flag_from_env("AI_GENERATION_ENABLED", true),
        }
    }

    pub fn with_ai_search(mut self, enabled: bool) -> Self {
        self.ai_search = enabled;
        self
    }

    pub fn with_ai_generation(mut self, enabled: bool) -> Self {
        self.ai_generation = enabled;
        self
    }
}

fn flag_from_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
