//! Error types for the completion pipeline.

use std::time::Duration;

/// The seven error kinds the pipeline surfaces to callers.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum McpError {
    /// `PriorityQueue` is at capacity; the request was rejected at submit
    /// time rather than blocking the caller.
    #[error("queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// The routed span (from submit, not from dispatch) exceeded its
    /// deadline.
    #[error("request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Provider call failed in a way that may succeed on retry (network
    /// blip, 5xx, connection reset).
    #[error("transient provider error: {0}")]
    ProviderTransient(String),

    /// Provider rejected the call with a rate-limit response. Carries the
    /// provider's `Retry-After` hint when present.
    #[error("rate limited, retry after {retry_after:?}")]
    ProviderRateLimited { retry_after: Option<Duration> },

    /// Provider call failed in a way retrying will not fix (auth, bad
    /// request, model not found).
    #[error("provider error: {0}")]
    ProviderFatal(String),

    /// The caller-supplied `ResponseParser` failed on an otherwise valid
    /// completion. Non-fatal: the raw text is still returned alongside this
    /// error (spec: "surface a ParseError but retain rawText").
    #[error("failed to parse response: {0}")]
    ParseError(String),

    /// Static configuration (strategy preset, router capability table,
    /// persisted cache envelope) was invalid or missing.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl McpError {
    /// Whether a retry may succeed. Used by the executor's backoff loop to
    /// decide whether to retry a failed provider call.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ProviderTransient(_) | Self::ProviderRateLimited { .. } => true,
            Self::QueueFull { .. }
            | Self::Timeout { .. }
            | Self::ProviderFatal(_)
            | Self::ParseError(_)
            | Self::ConfigError(_) => false,
        }
    }

    /// For `ProviderRateLimited`, the duration the provider suggests
    /// waiting before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::ProviderRateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        McpError::ConfigError(err.to_string())
    }
}

impl From<toml::de::Error> for McpError {
    fn from(err: toml::de::Error) -> Self {
        McpError::ConfigError(err.to_string())
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds() {
        assert!(McpError::ProviderTransient("x".into()).is_transient());
        assert!(McpError::ProviderRateLimited { retry_after: None }.is_transient());
    }

    #[test]
    fn permanent_kinds() {
        assert!(!McpError::QueueFull { capacity: 10 }.is_transient());
        assert!(!McpError::Timeout { elapsed_ms: 5000 }.is_transient());
        assert!(!McpError::ProviderFatal("bad request".into()).is_transient());
        assert!(!McpError::ParseError("bad json".into()).is_transient());
        assert!(!McpError::ConfigError("missing key".into()).is_transient());
    }

    #[test]
    fn retry_after_only_on_rate_limited() {
        let d = Duration::from_secs(2);
        let err = McpError::ProviderRateLimited {
            retry_after: Some(d),
        };
        assert_eq!(err.retry_after(), Some(d));
        assert_eq!(McpError::ProviderFatal("x".into()).retry_after(), None);
    }
}
