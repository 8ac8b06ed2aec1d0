//! Retry configuration and the `RetryingProviderGateway` decorator.
//!
//! Retry logic lives in one place, `with_retry()`, so `RetryingProviderGateway`
//! is a thin wrapper rather than duplicating the backoff loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{McpError, Result};
use crate::telemetry;
use crate::telemetry::{Event, EventCategory, EventName, EventSink};
use crate::types::ProviderId;

use super::{NormalizedRequest, NormalizedResponse, ProviderGateway};

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff with no jitter beyond what `retry_after` hints
/// impose; jitter was a source-level knob this crate doesn't need since
/// the executor already staggers dispatch via the priority queue.
///
/// ```
/// # use mcp_pipeline::provider::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request). 1 = no
    /// retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// `initial_delay * 2^attempt`, capped at `max_delay` (0-indexed attempt).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Effective delay, preferring a provider's `retry_after` hint over the
    /// calculated backoff when present.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.delay_for_attempt(attempt))
    }
}

/// Execute an async operation with retry logic.
///
/// Retries on transient errors (as classified by [`McpError::is_transient`])
/// up to `config.max_attempts`, using exponential backoff and respecting
/// `retry_after` hints from `ProviderRateLimited` errors. Permanent errors
/// are returned immediately without retry.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    events: &Arc<dyn EventSink>,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                metrics::counter!(telemetry::RETRIES_TOTAL, "provider" => provider_name.to_owned())
                    .increment(1);
                if matches!(e, McpError::ProviderRateLimited { .. }) {
                    events.emit(
                        Event::new(EventCategory::Error, EventName::RateLimited)
                            .with_field("provider", provider_name),
                    );
                }
                if attempt + 1 < config.max_attempts {
                    let delay = config.effective_delay(attempt, e.retry_after());
                    warn!(
                        provider = provider_name,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| McpError::ProviderFatal("retry loop exited with no attempts".into())))
}

/// Decorator wrapping a [`ProviderGateway`] with retry logic. The executor
/// wraps every configured gateway in one of these rather than retrying
/// inline, keeping the 7-step algorithm free of backoff bookkeeping.
pub struct RetryingProviderGateway {
    inner: Arc<dyn ProviderGateway>,
    config: RetryConfig,
    events: Arc<dyn EventSink>,
}

impl RetryingProviderGateway {
    pub fn new(inner: Arc<dyn ProviderGateway>, config: RetryConfig, events: Arc<dyn EventSink>) -> Self {
        Self { inner, config, events }
    }
}

#[async_trait]
impl ProviderGateway for RetryingProviderGateway {
    async fn complete(
        &self,
        provider: &ProviderId,
        req: &NormalizedRequest,
    ) -> Result<NormalizedResponse> {
        let provider_name = provider.to_string();
        with_retry(&self.config, &provider_name, &self.events, || {
            self.inner.complete(provider, req)
        })
        .await
    }
}
