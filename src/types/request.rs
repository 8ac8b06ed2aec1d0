//! Request types submitted to the pipeline.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use super::model::{ComplexityLevel, ModelId, ProviderId};
use super::response::Response;

/// Relative scheduling priority, highest-first within the queue.
///
/// Ordered so `Priority::High > Priority::Normal > Priority::Low` compares
/// correctly with the derived `Ord`, matching the weight table the
/// `PriorityQueue` keys dispatch order on (spec §4.2 — a closed
/// high/normal/low enumeration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    /// Numeric weight used by the queue's ordering key. Higher dispatches
    /// first. Kept as a method rather than inlined so the mapping lives in
    /// one place if the weight table is ever tuned.
    pub fn weight(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::High => 2,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Caller-supplied hints about the request, used by `SmartRouter` for model
/// selection and by `McpConfigManager` for priority inference.
///
/// The closed fields cover what the router and config manager consult;
/// `extra` is the escape hatch for forward-compat metadata this crate
/// doesn't interpret, mirroring the teacher's untagged-enum tolerance for
/// schema evolution in preset definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMetadata {
    #[serde(default, rename = "type")]
    pub r#type: Option<String>,
    #[serde(default)]
    pub complexity: Option<ComplexityLevel>,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub requires_reasoning: bool,
    #[serde(default)]
    pub requires_code: bool,
    #[serde(default)]
    pub requires_math: bool,
    #[serde(default)]
    pub requires_factual: bool,
    #[serde(default)]
    pub prompt_tokens: Option<usize>,
    #[serde(default)]
    pub expected_output_tokens: Option<usize>,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// `McpParams`: cache behavior and routing-priority parameters for one
/// request (spec §3). Distinct from `Request.priority` — that's the
/// queue's scheduling priority, this `priority` is the router's
/// speed/quality/cost weighting axis (`RoutingPriority`).
#[derive(Debug, Clone)]
pub struct McpParams {
    pub cache_strategy: crate::cache::CacheStrategy,
    /// Required when `cache_strategy != Exact` (spec §3 invariant).
    pub min_similarity: f32,
    pub cache_ttl: Duration,
    pub priority: crate::router::RoutingPriority,
    pub store_result: bool,
    pub preferred_provider: Option<ProviderId>,
}

impl Default for McpParams {
    fn default() -> Self {
        Self {
            cache_strategy: crate::cache::CacheStrategy::Hybrid,
            min_similarity: 0.80,
            cache_ttl: Duration::from_secs(12 * 3600),
            priority: crate::router::RoutingPriority::Quality,
            store_result: true,
            preferred_provider: None,
        }
    }
}

/// Parses a raw completion string into an application-defined shape.
///
/// A capability rather than a generic return type: `Request` stays
/// object-safe and constructible without turbofish noise at call sites,
/// mirroring how the teacher keeps `ChatOptions` a plain struct instead of
/// threading a generic through the gateway.
pub trait ResponseParser: Send + Sync {
    fn parse(&self, raw: &str) -> std::result::Result<Value, String>;
}

/// A unit of work submitted through `Pipeline::submit`.
pub struct Request {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub model: Option<ModelId>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub metadata: RequestMetadata,
    pub mcp_params: McpParams,
    pub parser: Option<Arc<dyn ResponseParser>>,
    /// Set by `Pipeline::submit` at enqueue time; the executor's timeout is
    /// measured from here, not from when the dispatcher picks the request
    /// up (spec §4.3 step 7).
    pub submitted_at: std::time::Instant,
    pub timeout: Duration,
    /// Completed by the executor once a `Response` is available. `Pipeline::
    /// submit` owns the receiving half.
    pub(crate) reply: Option<oneshot::Sender<Response>>,
}

/// Default end-to-end deadline, measured from submit (spec §4.3 step 7).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

impl Request {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            model: None,
            temperature: 1.0,
            max_tokens: 1024,
            metadata: RequestMetadata::default(),
            mcp_params: McpParams::default(),
            parser: None,
            submitted_at: std::time::Instant::now(),
            timeout: DEFAULT_TIMEOUT,
            reply: None,
        }
    }

    pub fn with_mcp_params(mut self, params: McpParams) -> Self {
        self.mcp_params = params;
        self
    }

    pub fn with_model(mut self, model: ModelId) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn ResponseParser>) -> Self {
        self.parser = Some(parser);
        self
    }
}
