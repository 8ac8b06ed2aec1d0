//! Response types returned from the pipeline.

use serde::{Deserialize, Serialize};

use super::model::{ModelId, ProviderId};

/// Token accounting reported by the provider, normalized to a common shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl Usage {
    pub fn total(&self) -> usize {
        self.prompt_tokens + self.completion_tokens
    }
}

/// What this request cost (or saved) relative to an uncached provider call.
///
/// `time_ms` and `cost` are both ~0 on a cache hit by definition (spec §4.6):
/// nothing was dispatched, so there is nothing to subtract from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Savings {
    pub tokens: u64,
    pub time_ms: f64,
    pub cost: f64,
}

/// Where a `Response` came from, for observability and `Savings` accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    ExactCache,
    SemanticCache,
    Provider,
}

/// Kind of error recorded on a `Response`. A strict subset of `McpError`:
/// `QueueFull` and `ConfigError` are surfaced as `Result` errors at
/// `submit()`, before a `Response` exists at all, so they never appear
/// here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The caller-supplied `ResponseParser` failed. Non-fatal: `text` still
    /// carries the raw completion (spec §4.3 step 4).
    ParseError,
    /// The routed span exceeded its deadline.
    Timeout,
    /// Retries were exhausted against a transient provider error.
    ProviderTransient,
    /// Provider call failed in a way retrying would not fix.
    ProviderFatal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one routed request. The executor never throws to callers —
/// every outcome, including a terminal failure, is surfaced as a
/// `Response` with `success=false` and `error` populated (spec §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub text: String,
    pub model: ModelId,
    /// The provider that actually served this response. `None` when the
    /// request never reached a provider (e.g. a deadline that had already
    /// passed at dispatch, or routing failing to resolve any provider).
    pub provider: Option<ProviderId>,
    pub usage: Usage,
    /// Parsed shape produced by the caller's `ResponseParser`, if one was
    /// supplied and parsing succeeded. `None` on a parser failure too, not
    /// just when no parser was supplied — see `error`.
    pub parsed_data: Option<serde_json::Value>,
    pub processing_time_ms: f64,
    pub source: Source,
    /// Cosine similarity of the matched entry, set only on a semantic cache
    /// hit. Exact-cache hits and provider calls leave this `None`.
    pub similarity: Option<f32>,
    pub savings: Savings,
    pub success: bool,
    /// Populated when `success` is false, or when a non-fatal issue (e.g.
    /// a parser failure) occurred alongside an otherwise successful call.
    pub error: Option<ErrorInfo>,
}

impl Response {
    pub fn is_cache_hit(&self) -> bool {
        !matches!(self.source, Source::Provider)
    }

    /// Build a terminal failure response. `model` is still recorded since
    /// routing may have already chosen one before the provider call failed.
    pub fn failure(model: ModelId, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            model,
            provider: None,
            usage: Usage::default(),
            parsed_data: None,
            processing_time_ms: 0.0,
            source: Source::Provider,
            similarity: None,
            savings: Savings::default(),
            success: false,
            error: Some(ErrorInfo {
                kind,
                message: message.into(),
            }),
        }
    }

    /// Attach the resolved provider to a failure built before it was known
    /// (e.g. a provider call that failed after routing already chose one).
    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }
}
