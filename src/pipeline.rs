//! Pipeline: public submit API plus admin operations (spec §6).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::cache::{CacheStats, CacheTier};
use crate::config::McpConfigManager;
use crate::error::{McpError, Result};
use crate::executor::Executor;
use crate::provider::ProviderGateway;
use crate::queue::{spawn_dispatchers, PriorityQueue};
use crate::router::{RouterSettings, SmartRouter, StrategyPreset};
use crate::telemetry::EventSink;
use crate::types::{McpParams, ModelMetadataOverride, Priority, ProviderId, Request, Response};

/// Combined snapshot returned by `Pipeline::stats()` / `getStats()`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub cache: CacheStats,
    pub active_requests: u64,
    pub settings: RouterSettings,
}

/// How many dispatcher workers to run by default.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default bound on the priority queue (spec §4.2 example).
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Wires the `PriorityQueue`, `Executor`, and `McpConfigManager` together
/// and exposes the caller-facing submit/admin surface (spec §6).
pub struct Pipeline {
    queue: Arc<PriorityQueue>,
    executor: Arc<Executor>,
    config: Arc<McpConfigManager>,
    cache: Arc<CacheTier>,
    router: Arc<SmartRouter>,
    active_requests: Arc<AtomicU64>,
    dispatchers: Vec<JoinHandle<()>>,
}

impl Pipeline {
    pub fn new(
        queue: Arc<PriorityQueue>,
        executor: Arc<Executor>,
        config: Arc<McpConfigManager>,
        cache: Arc<CacheTier>,
        router: Arc<SmartRouter>,
        worker_count: usize,
    ) -> Self {
        let dispatch_executor = executor.clone();
        let active_requests = Arc::new(AtomicU64::new(0));
        let dispatch_active = active_requests.clone();
        let dispatchers = spawn_dispatchers(queue.clone(), worker_count, move |mut request| {
            let executor = dispatch_executor.clone();
            let active_requests = dispatch_active.clone();
            async move {
                active_requests.fetch_add(1, Ordering::Relaxed);
                let reply = request.reply.take();
                let response = executor.execute(request).await;
                active_requests.fetch_sub(1, Ordering::Relaxed);
                if let Some(reply) = reply {
                    let _ = reply.send(response);
                }
            }
        });
        Self {
            queue,
            executor,
            config,
            cache,
            router,
            active_requests,
            dispatchers,
        }
    }

    /// Convenience constructor: embedded model seed, in-memory caches, no
    /// durable persistence, `DEFAULT_WORKER_COUNT` dispatchers. Not a global
    /// singleton — every call produces an independently owned instance
    /// (spec §5, "no global singletons in the contract").
    pub fn default_shared(
        provider: Arc<dyn ProviderGateway>,
        events: Arc<dyn EventSink>,
        default_model: crate::types::ModelId,
    ) -> Result<Self> {
        let router = Arc::new(SmartRouter::with_embedded_seed(default_model)?);
        let cache = Arc::new(CacheTier::new(
            crate::cache::DEFAULT_MAX_ENTRIES,
            crate::cache::DEFAULT_TTL,
            crate::cache::DEFAULT_DIMENSION,
            1000,
            Arc::new(crate::cache::HashedBagOfWordsEmbedder::default()),
            Arc::new(crate::cache::NullStore),
            "default",
        ));
        let retrying = Arc::new(crate::provider::RetryingProviderGateway::new(
            provider,
            crate::provider::RetryConfig::default(),
            events.clone(),
        ));
        let executor = Arc::new(Executor::new(cache.clone(), router.clone(), retrying, events));
        let queue = Arc::new(PriorityQueue::new(DEFAULT_QUEUE_CAPACITY));
        let config = Arc::new(McpConfigManager::default());
        Ok(Self::new(queue, executor, config, cache, router, DEFAULT_WORKER_COUNT))
    }

    /// Enqueue `request` and await its response. Rejects at submit time
    /// with `ConfigError` for an empty prompt, or `QueueFull` if the queue
    /// is at capacity (spec §7).
    pub async fn submit(&self, mut request: Request, priority: Priority) -> Result<Response> {
        if request.prompt.trim().is_empty() {
            return Err(McpError::ConfigError("prompt must not be empty".to_string()));
        }
        let (tx, rx) = oneshot::channel();
        request.reply = Some(tx);
        self.queue.push(priority, request).await?;
        rx.await
            .map_err(|_| McpError::ConfigError("executor dropped response channel".to_string()))
    }

    /// Submit with priority inferred from the request's metadata (spec
    /// §4.5, "priority inference").
    pub async fn submit_inferred(&self, request: Request) -> Result<Response> {
        let priority = self.config.infer_queue_priority(&request.metadata);
        self.submit(request, priority).await
    }

    pub fn set_strategy(&self, preset: StrategyPreset) {
        self.config.set_preset(preset);
    }

    pub fn strategy_params(&self) -> McpParams {
        self.config.build_mcp_params(None, None)
    }

    /// Partially adjust a model's metadata (spec §6, `updateStrategyConfig`
    /// applies to per-model routing metadata, not just the named preset).
    pub fn update_model_metadata(
        &self,
        model: &crate::types::ModelId,
        partial: &ModelMetadataOverride,
    ) -> Result<()> {
        self.router.override_model(model, partial)
    }

    pub fn set_preferred_provider(&self, provider: Option<ProviderId>) {
        self.router.set_preferred_provider(provider);
    }

    pub fn set_semantic_cache_enabled(&self, enabled: bool) {
        self.cache.set_semantic_enabled(enabled);
    }

    pub fn set_smart_routing_enabled(&self, enabled: bool) {
        self.router.set_smart_routing_enabled(enabled);
    }

    pub fn set_default_ttl(&self, ttl: Duration) {
        self.cache.set_default_ttl(ttl);
        self.config.set_default_ttl(ttl);
    }

    pub async fn queue_depth(&self) -> usize {
        self.queue.len().await
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            cache: self.cache.stats(),
            active_requests: self.active_requests.load(Ordering::Relaxed),
            settings: self.router.stats(),
        }
    }

    pub fn shutdown(&mut self) {
        for handle in self.dispatchers.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
