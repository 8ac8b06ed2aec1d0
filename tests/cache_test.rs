mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{build_pipeline, single_model_router, ScriptedGateway};
use mcp_pipeline::cache::CacheStrategy;
use mcp_pipeline::types::{McpParams, ModelId};
use mcp_pipeline::{Priority, Request};

#[tokio::test]
async fn exact_cache_round_trip() {
    let gateway = Arc::new(ScriptedGateway::always_succeeds("This is a test response"));
    let pipeline = build_pipeline(single_model_router(), gateway.clone(), 10, 1);

    let mut params = McpParams::default();
    params.cache_strategy = CacheStrategy::Exact;
    params.store_result = true;

    let req = || {
        Request::new("Test prompt")
            .with_model(ModelId::new("test-model"))
            .with_mcp_params(params.clone())
    };

    let first = pipeline.submit(req(), Priority::Normal).await.unwrap();
    assert!(first.success);
    assert_eq!(first.text, "This is a test response");
    assert!(!first.is_cache_hit());

    let second = pipeline.submit(req(), Priority::Normal).await.unwrap();
    assert_eq!(second.text, first.text);
    assert!(second.is_cache_hit());
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn ttl_expiry_makes_entry_unretrievable() {
    let gateway = Arc::new(ScriptedGateway::new(vec![
        Ok(mcp_pipeline::provider::NormalizedResponse {
            text: "first".into(),
            usage: mcp_pipeline::provider::NormalizedUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
            },
        }),
        Ok(mcp_pipeline::provider::NormalizedResponse {
            text: "second".into(),
            usage: mcp_pipeline::provider::NormalizedUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
            },
        }),
    ]));
    let pipeline = build_pipeline(single_model_router(), gateway.clone(), 10, 1);

    let mut params = McpParams::default();
    params.cache_strategy = CacheStrategy::Exact;
    params.cache_ttl = Duration::from_millis(5);

    let req = || {
        Request::new("expiring prompt")
            .with_model(ModelId::new("test-model"))
            .with_mcp_params(params.clone())
    };

    let first = pipeline.submit(req(), Priority::Normal).await.unwrap();
    assert_eq!(first.text, "first");

    tokio::time::sleep(Duration::from_millis(20)).await;

    let second = pipeline.submit(req(), Priority::Normal).await.unwrap();
    assert_eq!(second.text, "second");
    assert_eq!(gateway.call_count(), 2);
}

#[tokio::test]
async fn semantic_similarity_floor_is_respected() {
    let cache = mcp_pipeline::cache::SemanticCache::new(8, 10);
    let unit = |v: Vec<f32>| -> Vec<f32> {
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / norm).collect()
    };
    cache.set(mcp_pipeline::cache::SemanticCacheEntry {
        embedding: unit(vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        response: mcp_pipeline::Response {
            text: "cached answer".into(),
            model: ModelId::new("test-model"),
            provider: Some(mcp_pipeline::types::ProviderId::Claude),
            usage: mcp_pipeline::Usage::default(),
            parsed_data: None,
            processing_time_ms: 1.0,
            source: mcp_pipeline::Source::Provider,
            similarity: None,
            savings: mcp_pipeline::Savings::default(),
            success: true,
            error: None,
        },
        query: "original".into(),
        system_prompt: None,
        model: None,
        expires_at: std::time::Instant::now() + Duration::from_secs(60),
    });

    let distant_query = unit(vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    assert!(cache.find_similar(&distant_query, None, 0.5).is_none());

    let close_query = unit(vec![0.95, 0.05, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let found = cache.find_similar(&close_query, None, 0.5);
    assert!(found.is_some());
    assert!(found.unwrap().similarity >= 0.5);
}
