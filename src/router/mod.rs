//! SmartRouter: model selection, cost estimation, and provider resolution.

pub mod metadata;
pub mod preset;
pub mod selection;

pub use metadata::MetadataTable;
pub use preset::{PresetDefaults, RoutingPriority, StrategyPreset};
pub use selection::{CapabilityWeights, ModelScore, SelectionRequest, TaskType};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use serde::Serialize;

use crate::error::{McpError, Result};
use crate::types::{ComplexityLevel, ModelId, ModelMetadata, ModelMetadataOverride, ProviderId};

/// Per-model exponentially weighted moving average of observed request
/// durations. Never load-bearing for selection (the quality/speed score
/// uses static `average_response_time_ms` metadata, not live data); this
/// is future-use observability exposed through `SmartRouter::stats()`.
pub struct ProviderLatency {
    ewma_micros: AtomicU64,
    alpha: f64,
    count: AtomicU64,
}

impl ProviderLatency {
    pub fn new(alpha: f64) -> Self {
        debug_assert!((0.0..=1.0).contains(&alpha), "alpha must be in [0.0, 1.0]");
        Self {
            ewma_micros: AtomicU64::new(0_f64.to_bits()),
            alpha,
            count: AtomicU64::new(0),
        }
    }

    pub fn with_default_alpha() -> Self {
        Self::new(0.2)
    }

    pub fn record(&self, duration: Duration) {
        let micros = duration.as_micros() as f64;
        loop {
            let current_bits = self.ewma_micros.load(Ordering::Relaxed);
            let current = f64::from_bits(current_bits);
            let new = if self.count.load(Ordering::Relaxed) == 0 {
                micros
            } else {
                self.alpha * micros + (1.0 - self.alpha) * current
            };
            if self
                .ewma_micros
                .compare_exchange_weak(current_bits, new.to_bits(), Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                self.count.fetch_add(1, Ordering::Relaxed);
                break;
            }
        }
    }

    pub fn average(&self) -> Option<Duration> {
        if self.count.load(Ordering::Relaxed) == 0 {
            return None;
        }
        let micros = f64::from_bits(self.ewma_micros.load(Ordering::Relaxed));
        Some(Duration::from_micros(micros as u64))
    }

    pub fn observation_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ProviderLatency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderLatency")
            .field("average", &self.average())
            .field("count", &self.observation_count())
            .finish()
    }
}

/// Snapshot returned by `SmartRouter::stats()`, surfaced through
/// `Pipeline::stats()` (spec §6).
#[derive(Debug, Clone, Serialize)]
pub struct RouterSettings {
    pub model_count: usize,
    pub smart_routing_enabled: bool,
    pub preferred_provider: Option<ProviderId>,
}

/// Owns the model metadata table and the task→capability weight tables
/// used for quality scoring; chooses a model per request.
pub struct SmartRouter {
    metadata: MetadataTable,
    capability_weights: RwLock<HashMap<TaskType, CapabilityWeights>>,
    default_model: ModelId,
    latency: RwLock<HashMap<ModelId, ProviderLatency>>,
    smart_routing_enabled: RwLock<bool>,
    preferred_provider: RwLock<Option<ProviderId>>,
}

impl SmartRouter {
    pub fn new(
        metadata: MetadataTable,
        capability_weights: HashMap<TaskType, CapabilityWeights>,
        default_model: ModelId,
    ) -> Self {
        Self {
            metadata,
            capability_weights: RwLock::new(capability_weights),
            default_model,
            latency: RwLock::new(HashMap::new()),
            smart_routing_enabled: RwLock::new(true),
            preferred_provider: RwLock::new(None),
        }
    }

    /// Build a router with the embedded seed metadata and a single
    /// mandatory `general` capability weight table.
    pub fn with_embedded_seed(default_model: ModelId) -> Result<Self> {
        let metadata = MetadataTable::with_embedded_seed()?;
        let mut weights = HashMap::new();
        weights.insert(
            "general".to_string(),
            vec![("general".to_string(), 1.0)],
        );
        Ok(Self::new(metadata, weights, default_model))
    }

    pub fn set_smart_routing_enabled(&self, enabled: bool) {
        *self.smart_routing_enabled.write().expect("lock poisoned") = enabled;
    }

    pub fn smart_routing_enabled(&self) -> bool {
        *self.smart_routing_enabled.read().expect("lock poisoned")
    }

    pub fn set_preferred_provider(&self, provider: Option<ProviderId>) {
        *self.preferred_provider.write().expect("lock poisoned") = provider;
    }

    /// Choose a model per request by maximizing a weighted score. Returns
    /// the caller-configured default model if smart routing is disabled,
    /// no model is eligible, or the candidate pool is empty (spec §4.5,
    /// "observable fallback").
    ///
    /// `req.preferred_provider` wins when set; otherwise this falls back to
    /// the router-wide preference set via `set_preferred_provider` (spec
    /// §6, `setPreferredProvider`), so the admin toggle actually constrains
    /// selection rather than only being readable through `stats()`.
    pub fn select(&self, req: &SelectionRequest) -> ModelId {
        if !self.smart_routing_enabled() {
            return self.default_model.clone();
        }
        let candidates: HashMap<ModelId, ModelMetadata> =
            self.metadata.all().into_iter().collect();
        let weights = self.capability_weights.read().expect("lock poisoned");
        let stored_preference = self.preferred_provider.read().expect("lock poisoned").clone();
        let effective_req = SelectionRequest {
            preferred_provider: req.preferred_provider.or(stored_preference.as_ref()),
            ..req.clone()
        };
        selection::select_model(&candidates, &weights, &effective_req)
            .unwrap_or_else(|| self.default_model.clone())
    }

    pub fn provider_of(&self, model: &ModelId) -> Option<ProviderId> {
        self.metadata.get(model).map(|m| m.provider)
    }

    /// `promptTokenEstimate·costIn + outputTokenEstimate·costOut` (spec
    /// §4.5, also used directly by `estimate_cost`).
    pub fn estimate_cost(&self, model: &ModelId, prompt_tokens: u64, output_tokens: u64) -> Option<f64> {
        let metadata = self.metadata.get(model)?;
        Some(
            prompt_tokens as f64 * metadata.cost_per_input_token
                + output_tokens as f64 * metadata.cost_per_output_token,
        )
    }

    pub fn override_model(&self, model: &ModelId, partial: &ModelMetadataOverride) -> Result<()> {
        self.metadata.override_model(model, partial)
    }

    pub fn insert_model(&self, model: ModelId, metadata: ModelMetadata) {
        self.metadata.insert(model, metadata);
    }

    pub fn set_capability_weights(&self, task_type: impl Into<String>, weights: CapabilityWeights) {
        self.capability_weights
            .write()
            .expect("lock poisoned")
            .insert(task_type.into(), weights);
    }

    /// Record an observed request latency against a model's EWMA tracker,
    /// creating the tracker lazily on first observation.
    pub fn record_latency(&self, model: &ModelId, duration: Duration) {
        let needs_insert = !self.latency.read().expect("lock poisoned").contains_key(model);
        if needs_insert {
            self.latency
                .write()
                .expect("lock poisoned")
                .entry(model.clone())
                .or_insert_with(ProviderLatency::with_default_alpha);
        }
        if let Some(tracker) = self.latency.read().expect("lock poisoned").get(model) {
            tracker.record(duration);
        }
    }

    pub fn latency_average(&self, model: &ModelId) -> Option<Duration> {
        self.latency.read().expect("lock poisoned").get(model)?.average()
    }

    pub fn stats(&self) -> RouterSettings {
        RouterSettings {
            model_count: self.metadata.len(),
            smart_routing_enabled: self.smart_routing_enabled(),
            preferred_provider: self.preferred_provider.read().expect("lock poisoned").clone(),
        }
    }
}

/// Map `metadata.type`/`metadata.priority` to a queue `Priority` (spec
/// §4.5, "Priority inference from metadata").
pub fn infer_priority(metadata_type: Option<&str>) -> crate::types::Priority {
    use crate::types::Priority;
    let Some(t) = metadata_type else {
        return Priority::Normal;
    };
    let lower = t.to_lowercase();
    if lower.contains("interactive") || lower.contains("message") || lower.contains("critical") {
        Priority::High
    } else if lower.contains("background") || lower.contains("batch") || lower.contains("analysis") {
        Priority::Low
    } else {
        Priority::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_no_observations_returns_none() {
        let tracker = ProviderLatency::with_default_alpha();
        assert!(tracker.average().is_none());
    }

    #[test]
    fn latency_ewma_converges() {
        let tracker = ProviderLatency::new(0.5);
        tracker.record(Duration::from_millis(100));
        tracker.record(Duration::from_millis(200));
        assert_eq!(tracker.average().unwrap().as_millis(), 150);
    }

    #[test]
    fn disabled_smart_routing_returns_default() {
        let router = SmartRouter::with_embedded_seed(ModelId::new("fallback-model")).unwrap();
        router.set_smart_routing_enabled(false);
        let req = SelectionRequest {
            task_type: "general",
            complexity: ComplexityLevel::Low,
            required_capabilities: &[],
            preferred_provider: None,
            priority: RoutingPriority::Quality,
            prompt_token_estimate: 0,
            output_token_estimate: 0,
        };
        assert_eq!(router.select(&req).as_str(), "fallback-model");
    }

    #[test]
    fn priority_inference_matches_keywords() {
        assert_eq!(infer_priority(Some("interactive-chat")), crate::types::Priority::High);
        assert_eq!(infer_priority(Some("batch-job")), crate::types::Priority::Low);
        assert_eq!(infer_priority(Some("misc")), crate::types::Priority::Normal);
        assert_eq!(infer_priority(None), crate::types::Priority::Normal);
    }

    #[test]
    fn estimate_cost_uses_model_metadata() {
        let router = SmartRouter::with_embedded_seed(ModelId::new("claude-3-5-haiku")).unwrap();
        let model = ModelId::new("claude-3-5-haiku");
        let cost = router.estimate_cost(&model, 1000, 500);
        assert!(cost.is_some());
        assert!(cost.unwrap() > 0.0);
    }
}
