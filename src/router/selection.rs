//! Model selection: capability gating plus weighted quality/speed/cost scoring.

use std::collections::HashMap;

use crate::types::{ComplexityLevel, ModelId, ModelMetadata, ProviderId};

use super::preset::RoutingPriority;

/// Task type a request is classified as, used to pick the task→capability
/// weight table for the quality score (spec §4.5).
pub type TaskType = String;

/// `(capability_name, weight)` pairs describing how much each capability
/// contributes to the quality score for one task type.
pub type CapabilityWeights = Vec<(String, f64)>;

/// Inputs to `select_model`, one per request.
#[derive(Debug, Clone)]
pub struct SelectionRequest<'a> {
    pub task_type: &'a str,
    pub complexity: ComplexityLevel,
    pub required_capabilities: &'a [String],
    pub preferred_provider: Option<&'a ProviderId>,
    pub priority: RoutingPriority,
    pub prompt_token_estimate: u64,
    pub output_token_estimate: u64,
}

/// Per-model intermediate scores, exposed for observability and tests
/// rather than folded away inside `select_model`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelScore {
    pub eligible: bool,
    pub quality: f64,
    pub speed: f64,
    pub cost: f64,
    pub total: f64,
}

/// Capability gate: every required capability's score must be at least
/// `complexity.gate_threshold()` (spec §4.5 step 2).
pub fn is_eligible(
    metadata: &ModelMetadata,
    required_capabilities: &[String],
    complexity: ComplexityLevel,
    preferred_provider: Option<&ProviderId>,
) -> bool {
    if let Some(preferred) = preferred_provider {
        if &metadata.provider != preferred {
            return false;
        }
    }
    let threshold = complexity.gate_threshold();
    required_capabilities
        .iter()
        .all(|cap| metadata.capability_score(cap) >= threshold)
}

/// Weighted average of task-relevant capability scores, multiplied by the
/// complexity multiplier (spec §4.5 step 3). Falls back to an unweighted
/// `general` score when `weights` is empty.
pub fn quality_score(
    metadata: &ModelMetadata,
    weights: &CapabilityWeights,
    complexity: ComplexityLevel,
) -> f64 {
    let base = if weights.is_empty() {
        metadata.capability_score("general")
    } else {
        let total_weight: f64 = weights.iter().map(|(_, w)| w).sum();
        if total_weight <= 0.0 {
            metadata.capability_score("general")
        } else {
            weights
                .iter()
                .map(|(cap, w)| metadata.capability_score(cap) * w)
                .sum::<f64>()
                / total_weight
        }
    };
    base * complexity.quality_multiplier()
}

/// `10 − averageResponseTimeMs/500`, clamped to `[0, 10]` (spec §4.5 step 4).
pub fn speed_score(metadata: &ModelMetadata) -> f64 {
    (10.0 - metadata.average_response_time_ms / 500.0).clamp(0.0, 10.0)
}

/// Estimated cost normalized to a `[0, 10]` score, higher is cheaper (spec
/// §4.5 step 5).
pub fn cost_score(metadata: &ModelMetadata, prompt_tokens: u64, output_tokens: u64) -> f64 {
    let estimated_cost = prompt_tokens as f64 * metadata.cost_per_input_token
        + output_tokens as f64 * metadata.cost_per_output_token;
    10.0 - estimated_cost.min(0.10) / 0.10 * 10.0
}

/// Score one candidate model against a selection request.
pub fn score_model(
    metadata: &ModelMetadata,
    weights: &CapabilityWeights,
    req: &SelectionRequest,
) -> ModelScore {
    let eligible = is_eligible(
        metadata,
        req.required_capabilities,
        req.complexity,
        req.preferred_provider,
    );
    if !eligible {
        return ModelScore {
            eligible: false,
            quality: 0.0,
            speed: 0.0,
            cost: 0.0,
            total: 0.0,
        };
    }
    let quality = quality_score(metadata, weights, req.complexity);
    let speed = speed_score(metadata);
    let cost = cost_score(metadata, req.prompt_token_estimate, req.output_token_estimate);
    let (w_speed, w_quality, w_cost) = req.priority.weights();
    let total = quality * w_quality + speed * w_speed + cost * w_cost;
    ModelScore {
        eligible: true,
        quality,
        speed,
        cost,
        total,
    }
}

/// Pick the eligible model with the highest total score. Ties broken by
/// the lexicographically smallest `ModelId`, making selection deterministic
/// regardless of the candidates' iteration order — the source's
/// `selectModel` is insertion-order-dependent on ties, which this
/// intentionally fixes (see DESIGN.md).
pub fn select_model(
    candidates: &HashMap<ModelId, ModelMetadata>,
    capability_weights: &HashMap<TaskType, CapabilityWeights>,
    req: &SelectionRequest,
) -> Option<ModelId> {
    let empty_weights = Vec::new();
    let weights = capability_weights
        .get(req.task_type)
        .or_else(|| capability_weights.get("general"))
        .unwrap_or(&empty_weights);

    let mut best: Option<(ModelId, f64)> = None;
    let mut ordered: Vec<_> = candidates.iter().collect();
    ordered.sort_by(|a, b| a.0.cmp(b.0));
    for (id, metadata) in ordered {
        let score = score_model(metadata, weights, req);
        if !score.eligible {
            continue;
        }
        match &best {
            Some((_, best_total)) if *best_total >= score.total => {}
            _ => best = Some((id.clone(), score.total)),
        }
    }
    best.map(|(id, _)| id)
}
