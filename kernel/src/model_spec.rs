//! Model token-limit specification.
//!
//! A lightweight stand-in for the full models.dev-backed resolver: the kernel only
//! needs these limits to size `PlanState.history_window` and to budget
//! `Blueprint.budget.max_tokens_total` (§3); it doesn't need live pricing/catalog
//! lookups, so there's no HTTP resolver here, just the shape.

use serde::{Deserialize, Serialize};

/// Token limits for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub context_limit: u32,
    pub output_limit: u32,
    #[serde(default)]
    pub cache_read: Option<u32>,
    #[serde(default)]
    pub cache_write: Option<u32>,
}

impl ModelSpec {
    pub fn new(context_limit: u32, output_limit: u32) -> Self {
        Self {
            context_limit,
            output_limit,
            cache_read: None,
            cache_write: None,
        }
    }

    pub fn with_cache_read(mut self, limit: u32) -> Self {
        self.cache_read = Some(limit);
        self
    }

    pub fn with_cache_write(mut self, limit: u32) -> Self {
        self.cache_write = Some(limit);
        self
    }

    /// Falls back to a conservative default for unknown model names.
    pub fn for_model(name: &str) -> Self {
        match name {
            "gpt-4o" | "gpt-4o-mini" => Self::new(128_000, 16_384),
            "gpt-4.1" => Self::new(1_047_576, 32_768),
            _ => Self::new(32_000, 4_096),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: unknown model names fall back to a conservative default.
    #[test]
    fn unknown_model_falls_back_to_default() {
        let spec = ModelSpec::for_model("some-future-model");
        assert_eq!(spec.context_limit, 32_000);
    }

    /// **Scenario**: builder methods set optional cache limits.
    #[test]
    fn builder_sets_cache_limits() {
        let spec = ModelSpec::new(1000, 100).with_cache_read(500).with_cache_write(200);
        assert_eq!(spec.cache_read, Some(500));
        assert_eq!(spec.cache_write, Some(200));
    }
}
