//! Strategy-preset configuration: turns a named preset into `McpParams`
//! defaults and infers queue priority from request metadata.

use std::sync::RwLock;
use std::time::Duration;

use crate::router::{infer_priority, RoutingPriority, StrategyPreset};
use crate::types::{McpParams, Priority, ProviderId, RequestMetadata};

/// Owns the active [`StrategyPreset`] and builds [`McpParams`] for requests
/// that don't supply their own. Mutable at runtime via `Pipeline::
/// setStrategy` (spec §6).
pub struct McpConfigManager {
    preset: RwLock<StrategyPreset>,
    /// Overrides the active preset's TTL when set (spec §6, `setDefaultTTL`).
    default_ttl: RwLock<Option<Duration>>,
}

impl McpConfigManager {
    pub fn new(preset: StrategyPreset) -> Self {
        Self {
            preset: RwLock::new(preset),
            default_ttl: RwLock::new(None),
        }
    }

    pub fn preset(&self) -> StrategyPreset {
        *self.preset.read().expect("config lock poisoned")
    }

    pub fn set_preset(&self, preset: StrategyPreset) {
        *self.preset.write().expect("config lock poisoned") = preset;
    }

    pub fn set_default_ttl(&self, ttl: Duration) {
        *self.default_ttl.write().expect("config lock poisoned") = Some(ttl);
    }

    /// Build `McpParams` from the active preset, honoring an explicit
    /// caller-supplied routing priority and preferred provider override.
    pub fn build_mcp_params(
        &self,
        priority_override: Option<RoutingPriority>,
        preferred_provider: Option<ProviderId>,
    ) -> McpParams {
        let defaults = self.preset().defaults();
        let ttl = self
            .default_ttl
            .read()
            .expect("config lock poisoned")
            .unwrap_or(defaults.ttl);
        McpParams {
            cache_strategy: defaults.cache_strategy,
            min_similarity: defaults.min_similarity,
            cache_ttl: ttl,
            priority: priority_override.unwrap_or(defaults.priority),
            store_result: true,
            preferred_provider,
        }
    }

    /// Map a request's metadata to a queue [`Priority`] (spec §4.5).
    pub fn infer_queue_priority(&self, metadata: &RequestMetadata) -> Priority {
        infer_priority(metadata.r#type.as_deref())
    }
}

impl Default for McpConfigManager {
    fn default() -> Self {
        Self::new(StrategyPreset::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_manager_uses_balanced_preset() {
        let manager = McpConfigManager::default();
        assert_eq!(manager.preset(), StrategyPreset::Balanced);
    }

    #[test]
    fn build_mcp_params_reflects_preset() {
        let manager = McpConfigManager::new(StrategyPreset::Conservative);
        let params = manager.build_mcp_params(None, None);
        assert_eq!(params.cache_strategy, crate::cache::CacheStrategy::Exact);
        assert_eq!(params.min_similarity, 0.95);
    }

    #[test]
    fn explicit_priority_overrides_preset_default() {
        let manager = McpConfigManager::new(StrategyPreset::Balanced);
        let params = manager.build_mcp_params(Some(RoutingPriority::Cost), None);
        assert_eq!(params.priority, RoutingPriority::Cost);
    }

    #[test]
    fn set_preset_changes_subsequent_builds() {
        let manager = McpConfigManager::new(StrategyPreset::Balanced);
        manager.set_preset(StrategyPreset::Aggressive);
        let params = manager.build_mcp_params(None, None);
        assert_eq!(params.cache_strategy, crate::cache::CacheStrategy::Hybrid);
    }

    #[test]
    fn explicit_default_ttl_overrides_preset_ttl() {
        let manager = McpConfigManager::new(StrategyPreset::Balanced);
        manager.set_default_ttl(Duration::from_secs(42));
        let params = manager.build_mcp_params(None, None);
        assert_eq!(params.cache_ttl, Duration::from_secs(42));
    }

    #[test]
    fn priority_inference_delegates_to_router() {
        let manager = McpConfigManager::default();
        let mut metadata = RequestMetadata::default();
        metadata.r#type = Some("interactive-chat".to_string());
        assert_eq!(manager.infer_queue_priority(&metadata), Priority::High);
    }
}
