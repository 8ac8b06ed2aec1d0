//! Model identifiers, provider identifiers, and model metadata.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque model identifier, e.g. `"claude-3-7-sonnet-20250219"`.
///
/// Wraps a `String` rather than being a bare type alias so call sites read
/// as "this is a model id", matching the closed-enumeration treatment given
/// to [`ProviderId`] without forcing an exhaustive compiled-in model list
/// (model catalogs change far more often than providers do).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Closed enumeration of known providers.
///
/// Per the design note on stringly-typed provider ids, case variants like
/// `'claude'` / `'CLAUDE'` are collapsed to a single `Claude` variant at the
/// gateway boundary; see [`ProviderId::normalize`]. `Other` keeps the type
/// total rather than forcing every caller through a fallible conversion for
/// providers this crate doesn't special-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Claude,
    OpenAi,
    Google,
    Ollama,
    Other(String),
}

impl ProviderId {
    /// Normalize a free-form provider string (any case, common aliases) to
    /// a closed `ProviderId`. Unrecognized strings become `Other(lowercased)`.
    pub fn normalize(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Self::Claude,
            "openai" | "gpt" => Self::OpenAi,
            "google" | "gemini" => Self::Google,
            "ollama" => Self::Ollama,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Claude => "claude",
            Self::OpenAi => "openai",
            Self::Google => "google",
            Self::Ollama => "ollama",
            Self::Other(s) => s.as_str(),
        };
        write!(f, "{s}")
    }
}

/// A task complexity tier, used both for router capability gating and for
/// the quality-score complexity multiplier (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    /// Capability-gate threshold for this level (spec §4.5 step 2).
    pub fn gate_threshold(self) -> f64 {
        match self {
            Self::Low => 3.0,
            Self::Medium => 6.0,
            Self::High => 8.0,
        }
    }

    /// Quality-score complexity multiplier (spec §4.5 step 3).
    pub fn quality_multiplier(self) -> f64 {
        match self {
            Self::Low => 0.7,
            Self::Medium => 1.0,
            Self::High => 1.3,
        }
    }
}

/// Static metadata about a model, owned by the `SmartRouter` (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub provider: ProviderId,
    pub context_size: usize,
    pub cost_per_input_token: f64,
    pub cost_per_output_token: f64,
    pub average_response_time_ms: f64,
    /// Capability name → score in `[0, 10]`.
    pub capabilities: HashMap<String, f64>,
}

impl ModelMetadata {
    /// Score for a capability, or 0.0 if the model doesn't declare it.
    pub fn capability_score(&self, name: &str) -> f64 {
        self.capabilities.get(name).copied().unwrap_or(0.0)
    }
}

/// Partial override applied to an existing [`ModelMetadata`] entry via
/// `SmartRouter::override_model` (spec §4.5, "user-overridable").
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelMetadataOverride {
    pub provider: Option<ProviderId>,
    pub context_size: Option<usize>,
    pub cost_per_input_token: Option<f64>,
    pub cost_per_output_token: Option<f64>,
    pub average_response_time_ms: Option<f64>,
    #[serde(default)]
    pub capabilities: HashMap<String, f64>,
}

impl ModelMetadataOverride {
    pub fn apply(&self, base: &mut ModelMetadata) {
        if let Some(p) = self.provider.clone() {
            base.provider = p;
        }
        if let Some(c) = self.context_size {
            base.context_size = c;
        }
        if let Some(c) = self.cost_per_input_token {
            base.cost_per_input_token = c;
        }
        if let Some(c) = self.cost_per_output_token {
            base.cost_per_output_token = c;
        }
        if let Some(t) = self.average_response_time_ms {
            base.average_response_time_ms = t;
        }
        for (k, v) in &self.capabilities {
            base.capabilities.insert(k.clone(), *v);
        }
    }
}
