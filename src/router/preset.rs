//! Strategy presets: named bundles of `McpParams` defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheStrategy;
use crate::types::Priority;

/// Priority axis the router optimizes for, distinct from [`Priority`]
/// (queue scheduling weight) despite the similar name — this is the
/// `priority ∈ {speed, quality, cost}` selection-weighting input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingPriority {
    Speed,
    Quality,
    Cost,
}

impl RoutingPriority {
    /// Weight vector `(speed, quality, cost)` applied to the three scores
    /// in the selection algorithm (spec §4.5).
    pub fn weights(self) -> (f64, f64, f64) {
        match self {
            Self::Speed => (0.6, 0.3, 0.1),
            Self::Quality => (0.1, 0.8, 0.1),
            Self::Cost => (0.2, 0.2, 0.6),
        }
    }
}

/// Default parameter bundle for a named preset.
#[derive(Debug, Clone, Copy)]
pub struct PresetDefaults {
    pub cache_strategy: CacheStrategy,
    pub min_similarity: f32,
    pub ttl: Duration,
    pub priority: RoutingPriority,
}

/// Closed set of named strategy presets (spec §4.5). Ordering invariants
/// across these three (`minSimilarity` strictly increasing from aggressive
/// to conservative; conservative is exact-only) are testable properties,
/// not incidental defaults — see the tests below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyPreset {
    Aggressive,
    Balanced,
    Conservative,
}

impl StrategyPreset {
    pub fn defaults(self) -> PresetDefaults {
        match self {
            Self::Aggressive => PresetDefaults {
                cache_strategy: CacheStrategy::Hybrid,
                min_similarity: 0.65,
                ttl: Duration::from_secs(24 * 3600),
                priority: RoutingPriority::Speed,
            },
            Self::Balanced => PresetDefaults {
                cache_strategy: CacheStrategy::Semantic,
                min_similarity: 0.80,
                ttl: Duration::from_secs(12 * 3600),
                priority: RoutingPriority::Quality,
            },
            Self::Conservative => PresetDefaults {
                cache_strategy: CacheStrategy::Exact,
                min_similarity: 0.95,
                ttl: Duration::from_secs(3600),
                priority: RoutingPriority::Quality,
            },
        }
    }
}

impl Default for StrategyPreset {
    fn default() -> Self {
        Self::Balanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_similarity_increases_aggressive_to_conservative() {
        let aggressive = StrategyPreset::Aggressive.defaults().min_similarity;
        let balanced = StrategyPreset::Balanced.defaults().min_similarity;
        let conservative = StrategyPreset::Conservative.defaults().min_similarity;
        assert!(aggressive < balanced);
        assert!(balanced < conservative);
    }

    #[test]
    fn conservative_is_exact_only() {
        assert_eq!(
            StrategyPreset::Conservative.defaults().cache_strategy,
            CacheStrategy::Exact
        );
    }

    #[test]
    fn routing_priority_weights_sum_to_one() {
        for priority in [
            RoutingPriority::Speed,
            RoutingPriority::Quality,
            RoutingPriority::Cost,
        ] {
            let (s, q, c) = priority.weights();
            assert!((s + q + c - 1.0).abs() < 1e-9);
        }
    }
}
