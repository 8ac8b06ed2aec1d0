//! Executor: the 7-step request-to-response algorithm.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::{CacheStrategy, CacheTier, ExactKey, SemanticCacheEntry};
use crate::provider::{NormalizedMessage, NormalizedRequest, ProviderGateway};
use crate::router::{SelectionRequest, SmartRouter};
use crate::telemetry::{Event, EventCategory, EventName, EventSink};
use crate::types::{ComplexityLevel, ErrorInfo, ErrorKind, ModelId, ProviderId, Request, Response, Savings, Source, Usage};

/// Consumes one `Request` and produces one `Response`. Never propagates an
/// error to the caller: every outcome, including a terminal failure, comes
/// back as a `Response` (spec §4.3).
pub struct Executor {
    cache: Arc<CacheTier>,
    router: Arc<SmartRouter>,
    provider: Arc<dyn ProviderGateway>,
    events: Arc<dyn EventSink>,
}

impl Executor {
    pub fn new(
        cache: Arc<CacheTier>,
        router: Arc<SmartRouter>,
        provider: Arc<dyn ProviderGateway>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            cache,
            router,
            provider,
            events,
        }
    }

    pub async fn execute(&self, mut req: Request) -> Response {
        let deadline = req.submitted_at + req.timeout;
        if Instant::now() >= deadline {
            let model = req.model.clone().unwrap_or_else(|| ModelId::new("unknown"));
            self.events.emit(Event::new(EventCategory::Error, EventName::RequestTimeout));
            return Response::failure(model, ErrorKind::Timeout, "deadline already passed at dispatch");
        }
        let remaining = deadline - Instant::now();
        match tokio::time::timeout(remaining, self.run(&mut req)).await {
            Ok(response) => response,
            Err(_) => {
                let model = req.model.clone().unwrap_or_else(|| ModelId::new("unknown"));
                self.events
                    .emit(Event::new(EventCategory::Error, EventName::RequestTimeout).with_field("model", &model));
                Response::failure(model, ErrorKind::Timeout, "request timed out")
            }
        }
    }

    async fn run(&self, req: &mut Request) -> Response {
        let start = Instant::now();

        // Step 1: route if needed.
        if req.model.is_none() {
            let mut required_capabilities = Vec::new();
            if req.metadata.requires_reasoning {
                required_capabilities.push("reasoning".to_string());
            }
            if req.metadata.requires_code {
                required_capabilities.push("code_generation".to_string());
            }
            if req.metadata.requires_math {
                required_capabilities.push("math".to_string());
            }
            if req.metadata.requires_factual {
                required_capabilities.push("factual".to_string());
            }
            let selection_req = SelectionRequest {
                task_type: req.metadata.task_type.as_deref().unwrap_or("general"),
                complexity: req.metadata.complexity.unwrap_or(ComplexityLevel::Medium),
                required_capabilities: &required_capabilities,
                preferred_provider: req.mcp_params.preferred_provider.as_ref(),
                priority: req.mcp_params.priority,
                prompt_token_estimate: req.metadata.prompt_tokens.unwrap_or(req.prompt.len() / 4) as u64,
                output_token_estimate: req.metadata.expected_output_tokens.unwrap_or(req.max_tokens) as u64,
            };
            let model = self.router.select(&selection_req);
            self.events.emit(
                Event::new(EventCategory::Mcp, EventName::SmartRouting).with_field("model", &model),
            );
            req.model = Some(model);
        }
        let model = req.model.clone().expect("model assigned above");
        let strategy = req.mcp_params.cache_strategy;

        // Step 2: exact lookup.
        if matches!(strategy, CacheStrategy::Exact | CacheStrategy::Hybrid) {
            let key = ExactKey::compute(
                model.as_str(),
                Some(round_temperature(req.temperature)),
                req.system_prompt.as_deref(),
                &req.prompt,
            );
            if let Some(mut response) = self.cache.exact().get(&key) {
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                response.source = Source::ExactCache;
                response.savings = self.cache_hit_savings(&model, response.usage, elapsed_ms);
                response.processing_time_ms = elapsed_ms;
                self.events.emit(Event::new(EventCategory::Response, EventName::CacheHit).with_field("tier", "exact"));
                return response;
            }
        }

        // Step 3: semantic lookup.
        if matches!(strategy, CacheStrategy::Semantic | CacheStrategy::Hybrid) && self.cache.semantic_enabled() {
            let embedding = self.cache.embedder().embed(&req.prompt).await;
            match embedding {
                Ok(query_embedding) => {
                    let found = self.cache.semantic().find_similar(
                        &query_embedding,
                        Some(&model),
                        req.mcp_params.min_similarity,
                    );
                    if let Some(matched) = found {
                        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                        let mut response = matched.response;
                        response.source = Source::SemanticCache;
                        response.similarity = Some(matched.similarity);
                        response.savings = self.cache_hit_savings(&model, response.usage, elapsed_ms);
                        response.processing_time_ms = elapsed_ms;
                        self.events.emit(Event::new(EventCategory::Response, EventName::CacheHit).with_field("tier", "semantic"));
                        return response;
                    }
                    self.events.emit(Event::new(EventCategory::Response, EventName::SemanticCacheMiss));
                }
                Err(_) => {
                    // Embedding failure degrades to a cache miss rather than
                    // failing the whole request; the provider call below is
                    // still attempted.
                    self.events.emit(Event::new(EventCategory::Error, EventName::SemanticCacheMiss));
                }
            }
        }

        // Step 4: provider call.
        let provider_id = match self.router.provider_of(&model) {
            Some(p) => p,
            None => {
                self.events.emit(Event::new(EventCategory::Error, EventName::RequestFailed));
                return Response::failure(model, ErrorKind::ProviderFatal, "no provider known for model");
            }
        };
        let normalized_req = NormalizedRequest {
            model: model.as_str().to_string(),
            messages: vec![NormalizedMessage {
                role: "user".to_string(),
                content: req.prompt.clone(),
            }],
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            system: req.system_prompt.clone(),
        };
        self.events.emit(Event::new(EventCategory::Request, EventName::ApiCall).with_field("model", &model));
        let call_started = Instant::now();
        let provider_result = self.provider.complete(&provider_id, &normalized_req).await;
        self.router.record_latency(&model, call_started.elapsed());

        let mut response = match provider_result {
            Ok(normalized) => {
                let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
                let mut response = Response {
                    text: normalized.text,
                    model: model.clone(),
                    provider: Some(provider_id.clone()),
                    usage: Usage {
                        prompt_tokens: normalized.usage.prompt_tokens,
                        completion_tokens: normalized.usage.completion_tokens,
                    },
                    parsed_data: None,
                    processing_time_ms,
                    source: Source::Provider,
                    similarity: None,
                    savings: Savings::default(),
                    success: true,
                    error: None,
                };
                if let Some(parser) = &req.parser {
                    match parser.parse(&response.text) {
                        Ok(value) => response.parsed_data = Some(value),
                        Err(message) => {
                            self.events.emit(Event::new(EventCategory::Error, EventName::ParsingError));
                            response.error = Some(ErrorInfo {
                                kind: ErrorKind::ParseError,
                                message,
                            });
                        }
                    }
                }
                response
            }
            Err(err) => {
                self.events.emit(Event::new(EventCategory::Error, EventName::RequestFailed));
                let kind = if err.is_transient() {
                    ErrorKind::ProviderTransient
                } else {
                    ErrorKind::ProviderFatal
                };
                return Response::failure(model, kind, err.to_string()).with_provider(provider_id);
            }
        };

        // Step 5: store.
        if req.mcp_params.store_result && response.success {
            if matches!(strategy, CacheStrategy::Exact | CacheStrategy::Hybrid) {
                let key = ExactKey::compute(
                    model.as_str(),
                    Some(round_temperature(req.temperature)),
                    req.system_prompt.as_deref(),
                    &req.prompt,
                );
                self.cache.exact().set(key, response.clone(), Some(req.mcp_params.cache_ttl));
                self.events.emit(Event::new(EventCategory::Mcp, EventName::StoreInCache).with_field("tier", "exact"));
            }
            if matches!(strategy, CacheStrategy::Semantic | CacheStrategy::Hybrid) && self.cache.semantic_enabled() {
                if let Ok(embedding) = self.cache.embedder().embed(&req.prompt).await {
                    self.cache.semantic().set(SemanticCacheEntry {
                        embedding,
                        response: response.clone(),
                        query: req.prompt.clone(),
                        system_prompt: req.system_prompt.clone(),
                        model: Some(model.clone()),
                        expires_at: Instant::now() + req.mcp_params.cache_ttl,
                    });
                    self.events.emit(Event::new(EventCategory::Mcp, EventName::StoreInCache).with_field("tier", "semantic"));
                }
            }
        }

        response
    }

    /// Savings recorded on a cache hit (spec §4.6): tokens from the cached
    /// entry's usage (falling back to 500 when it recorded none), cost
    /// re-estimated via the `tokens*0.7`/`tokens*0.3` prompt/completion
    /// split rather than the original call's actual split, and `time_ms`
    /// from this hit's own elapsed time, not the original call's duration.
    fn cache_hit_savings(&self, model: &ModelId, cached_usage: Usage, elapsed_ms: f64) -> Savings {
        let tokens = match cached_usage.total() {
            0 => 500,
            total => total as u64,
        };
        let cost = self
            .router
            .estimate_cost(model, (tokens as f64 * 0.7) as u64, (tokens as f64 * 0.3) as u64)
            .unwrap_or(0.0);
        Savings {
            tokens,
            cost,
            time_ms: elapsed_ms,
        }
    }
}

/// Round to one decimal place so near-identical floats hash identically
/// (spec §3, exact key based on "rounded temperature").
fn round_temperature(temperature: f32) -> f32 {
    (temperature * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{HashedBagOfWordsEmbedder, NullStore};
    use crate::provider::mock::MockProviderGateway;
    use crate::provider::NormalizedUsage;
    use crate::router::MetadataTable;
    use crate::telemetry::NullEventSink;
    use crate::types::ProviderId;
    use std::collections::HashMap;
    use std::time::Duration;

    fn router_with_one_model() -> Arc<SmartRouter> {
        let table = MetadataTable::empty();
        table.insert(
            ModelId::new("test-model"),
            crate::types::ModelMetadata {
                provider: ProviderId::Claude,
                context_size: 100_000,
                cost_per_input_token: 0.000001,
                cost_per_output_token: 0.000002,
                average_response_time_ms: 500.0,
                capabilities: HashMap::from([("general".to_string(), 9.0)]),
            },
        );
        let mut weights = HashMap::new();
        weights.insert("general".to_string(), vec![("general".to_string(), 1.0)]);
        Arc::new(SmartRouter::new(table, weights, ModelId::new("test-model")))
    }

    fn cache_tier() -> Arc<CacheTier> {
        Arc::new(CacheTier::new(
            100,
            Duration::from_secs(3600),
            16,
            100,
            Arc::new(HashedBagOfWordsEmbedder::new(16)),
            Arc::new(NullStore),
            "test",
        ))
    }

    #[tokio::test]
    async fn successful_provider_call_returns_response() {
        let provider = Arc::new(MockProviderGateway::always_succeeds("hello back"));
        let executor = Executor::new(cache_tier(), router_with_one_model(), provider, Arc::new(NullEventSink));
        let req = Request::new("hi").with_model(ModelId::new("test-model"));
        let response = executor.execute(req).await;
        assert!(response.success);
        assert_eq!(response.text, "hello back");
        assert_eq!(response.source, Source::Provider);
        assert_eq!(response.provider, Some(ProviderId::Claude));
    }

    #[tokio::test]
    async fn exact_cache_hit_skips_provider() {
        let provider = Arc::new(MockProviderGateway::always_succeeds("first"));
        let cache = cache_tier();
        let router = router_with_one_model();
        let executor = Executor::new(cache, router, provider.clone(), Arc::new(NullEventSink));

        let mut params = crate::types::McpParams::default();
        params.cache_strategy = CacheStrategy::Exact;
        let req = Request::new("same prompt")
            .with_model(ModelId::new("test-model"))
            .with_mcp_params(params.clone());
        let first = executor.execute(req).await;
        assert!(first.success);

        let req2 = Request::new("same prompt")
            .with_model(ModelId::new("test-model"))
            .with_mcp_params(params);
        let second = executor.execute(req2).await;
        assert_eq!(second.source, Source::ExactCache);
        assert_eq!(provider.call_count(), 1);
        // Cached usage is 15 tokens (10 + 5), below the 500 fallback floor,
        // so savings.tokens reports the real total rather than the fallback.
        assert_eq!(second.savings.tokens, 15);
        assert_eq!(second.provider, Some(ProviderId::Claude));
    }

    #[tokio::test]
    async fn provider_fatal_error_yields_failure_response() {
        let provider = Arc::new(MockProviderGateway::scripted(vec![Err(
            crate::error::McpError::ProviderFatal("bad request".into()),
        )]));
        let executor = Executor::new(cache_tier(), router_with_one_model(), provider, Arc::new(NullEventSink));
        let req = Request::new("hi").with_model(ModelId::new("test-model"));
        let response = executor.execute(req).await;
        assert!(!response.success);
        assert_eq!(response.error.unwrap().kind, ErrorKind::ProviderFatal);
    }

    #[tokio::test]
    async fn already_expired_deadline_fails_without_dispatch() {
        let provider = Arc::new(MockProviderGateway::always_succeeds("unused"));
        let executor = Executor::new(cache_tier(), router_with_one_model(), provider.clone(), Arc::new(NullEventSink));
        let mut req = Request::new("hi").with_model(ModelId::new("test-model"));
        req.submitted_at = Instant::now() - Duration::from_secs(60);
        req.timeout = Duration::from_secs(1);
        let response = executor.execute(req).await;
        assert!(!response.success);
        assert_eq!(response.error.unwrap().kind, ErrorKind::Timeout);
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn round_temperature_collapses_near_identical_floats() {
        assert_eq!(round_temperature(0.701), round_temperature(0.699));
    }
}
