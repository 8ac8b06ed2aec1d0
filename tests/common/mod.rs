//! Shared black-box test fixtures: a scripted provider gateway and small
//! pipeline builders, grounded in the crate's own internal mock-provider
//! pattern but usable from outside the crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use mcp_pipeline::config::McpConfigManager;
use mcp_pipeline::error::{McpError, Result};
use mcp_pipeline::executor::Executor;
use mcp_pipeline::provider::{NormalizedRequest, NormalizedResponse, NormalizedUsage, ProviderGateway};
use mcp_pipeline::queue::PriorityQueue;
use mcp_pipeline::router::{MetadataTable, SmartRouter};
use mcp_pipeline::telemetry::NullEventSink;
use mcp_pipeline::types::{ModelId, ModelMetadata, ProviderId};
use mcp_pipeline::Pipeline;

/// A provider gateway that replays a scripted sequence of results, one per
/// call; once exhausted, further calls fail with `ProviderFatal`.
pub struct ScriptedGateway {
    responses: Mutex<Vec<Result<NormalizedResponse>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new(responses: Vec<Result<NormalizedResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_succeeds(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(NormalizedResponse {
            text: text.into(),
            usage: NormalizedUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
            },
        })])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderGateway for ScriptedGateway {
    async fn complete(&self, provider: &ProviderId, req: &NormalizedRequest) -> Result<NormalizedResponse> {
        self.calls.lock().unwrap().push(format!("{provider}:{}", req.model));
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(McpError::ProviderFatal("scripted gateway exhausted".to_string()));
        }
        responses.remove(0)
    }
}

/// A single eligible model, `"test-model"`, served by `ProviderId::Claude`.
pub fn single_model_router() -> Arc<SmartRouter> {
    let table = MetadataTable::empty();
    table.insert(
        ModelId::new("test-model"),
        ModelMetadata {
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

/// Construct a `Pipeline` with a freshly built in-memory cache, the given
/// router and gateway, and a small queue/worker pool suited to tests.
pub fn build_pipeline(router: Arc<SmartRouter>, gateway: Arc<dyn ProviderGateway>, queue_capacity: usize, worker_count: usize) -> Pipeline {
    let cache = Arc::new(mcp_pipeline::cache::CacheTier::new(
        100,
        Duration::from_secs(3600),
        16,
        100,
        Arc::new(mcp_pipeline::cache::HashedBagOfWordsEmbedder::new(16)),
        Arc::new(mcp_pipeline::cache::NullStore),
        "test",
    ));
    let executor = Arc::new(Executor::new(cache.clone(), router.clone(), gateway, Arc::new(NullEventSink)));
    let queue = Arc::new(PriorityQueue::new(queue_capacity));
    let config = Arc::new(McpConfigManager::default());
    Pipeline::new(queue, executor, config, cache, router, worker_count)
}
