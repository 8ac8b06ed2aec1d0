//! EventSink trait, event records, and metric name constants.
//!
//! Consumers install their own `metrics` recorder (prometheus, statsd, ...);
//! without one installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `mcp_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).

use std::fmt;
use std::sync::Arc;

/// Top-level category an [`Event`] is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Request,
    Response,
    Error,
    Mcp,
    Feedback,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Error => "error",
            Self::Mcp => "mcp",
            Self::Feedback => "feedback",
        };
        write!(f, "{s}")
    }
}

/// One of the named events the core emits (spec §4.8).
#[derive(Debug, Clone, PartialEq)]
pub enum EventName {
    CacheHit,
    SemanticCacheMiss,
    SmartRouting,
    ApiCall,
    RequestTimeout,
    RequestFailed,
    ParsingError,
    StoreInCache,
    RateLimited,
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CacheHit => "cache_hit",
            Self::SemanticCacheMiss => "semantic_cache_miss",
            Self::SmartRouting => "smart_routing",
            Self::ApiCall => "api_call",
            Self::RequestTimeout => "request_timeout",
            Self::RequestFailed => "request_failed",
            Self::ParsingError => "parsing_error",
            Self::StoreInCache => "store_in_cache",
            Self::RateLimited => "rate_limited",
        };
        write!(f, "{s}")
    }
}

/// An append-only record emitted by the executor and cache tier.
#[derive(Debug, Clone)]
pub struct Event {
    pub category: EventCategory,
    pub name: EventName,
    /// Free-form context, e.g. model id, similarity score, elapsed ms.
    /// Kept as owned strings rather than a generic so `EventSink::emit`
    /// stays a plain, non-generic trait method.
    pub fields: Vec<(&'static str, String)>,
}

impl Event {
    pub fn new(category: EventCategory, name: EventName) -> Self {
        Self {
            category,
            name,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, key: &'static str, value: impl ToString) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }
}

/// Append-only analytics sink. Emission is best-effort and non-blocking: a
/// sink may drop events under backpressure without affecting request
/// processing (spec §5).
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Default `EventSink` forwarding every event to a `tracing` span at a
/// level appropriate to its category.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: Event) {
        let fields = event
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        match event.category {
            EventCategory::Error => {
                tracing::warn!(name = %event.name, %fields, "mcp event")
            }
            EventCategory::Request | EventCategory::Response => {
                tracing::debug!(name = %event.name, %fields, "mcp event")
            }
            EventCategory::Mcp | EventCategory::Feedback => {
                tracing::info!(name = %event.name, %fields, "mcp event")
            }
        }
    }
}

/// `EventSink` that discards every event. Useful for tests that don't care
/// about analytics output.
#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: Event) {}
}

/// Emits `metrics`-crate counters alongside whatever a wrapped sink does,
/// so the metrics rollup named in the implementation budget has a concrete
/// backing recorder in addition to the structured event log.
pub struct MetricsEventSink<S: EventSink> {
    inner: S,
}

impl<S: EventSink> MetricsEventSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: EventSink> EventSink for MetricsEventSink<S> {
    fn emit(&self, event: Event) {
        match event.name {
            EventName::CacheHit => metrics::counter!(CACHE_HITS_TOTAL).increment(1),
            EventName::SemanticCacheMiss => metrics::counter!(CACHE_MISSES_TOTAL).increment(1),
            EventName::SmartRouting => metrics::counter!(ROUTING_DECISIONS_TOTAL).increment(1),
            EventName::ApiCall => metrics::counter!(REQUESTS_TOTAL).increment(1),
            EventName::RequestTimeout => metrics::counter!(TIMEOUTS_TOTAL).increment(1),
            EventName::RequestFailed => metrics::counter!(FAILURES_TOTAL).increment(1),
            EventName::ParsingError => metrics::counter!(PARSE_ERRORS_TOTAL).increment(1),
            EventName::StoreInCache => metrics::counter!(CACHE_STORES_TOTAL).increment(1),
            EventName::RateLimited => metrics::counter!(RATE_LIMITED_TOTAL).increment(1),
        }
        self.inner.emit(event);
    }
}

/// Convenience constructor matching the teacher's `Arc<dyn Trait>` wiring
/// for default sinks (tracing + metrics).
pub fn default_event_sink() -> Arc<dyn EventSink> {
    Arc::new(MetricsEventSink::new(TracingEventSink))
}

/// Total requests dispatched to a provider (cache misses only).
///
/// Labels: `provider`, `model`.
pub const REQUESTS_TOTAL: &str = "mcp_requests_total";

/// Request duration in seconds, measured from submit to response.
pub const REQUEST_DURATION_SECONDS: &str = "mcp_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
pub const RETRIES_TOTAL: &str = "mcp_retries_total";

/// Total provider calls that reported a rate limit.
pub const RATE_LIMITED_TOTAL: &str = "mcp_rate_limited_total";

/// Total requests that exhausted retries and timed out.
pub const TIMEOUTS_TOTAL: &str = "mcp_timeouts_total";

/// Total requests that failed permanently (non-retryable provider error).
pub const FAILURES_TOTAL: &str = "mcp_failures_total";

/// Total caller-supplied response parser failures.
pub const PARSE_ERRORS_TOTAL: &str = "mcp_parse_errors_total";

/// Total entries written into either cache tier.
pub const CACHE_STORES_TOTAL: &str = "mcp_cache_stores_total";

/// Total cache hits (exact or semantic).
pub const CACHE_HITS_TOTAL: &str = "mcp_cache_hits_total";

/// Total cache misses (exact and semantic both missed).
pub const CACHE_MISSES_TOTAL: &str = "mcp_cache_misses_total";

/// Total SmartRouter selection decisions made (requests with no explicit
/// model override).
pub const ROUTING_DECISIONS_TOTAL: &str = "mcp_routing_decisions_total";

/// Current depth of the priority queue.
pub const QUEUE_DEPTH: &str = "mcp_queue_depth";
