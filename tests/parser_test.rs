mod common;

use std::sync::Arc;

use common::{build_pipeline, single_model_router, ScriptedGateway};
use mcp_pipeline::types::{ErrorKind, ModelId, ResponseParser};
use mcp_pipeline::{Priority, Request};
use serde_json::Value;

struct JsonParser;

impl ResponseParser for JsonParser {
    fn parse(&self, raw: &str) -> Result<Value, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }
}

#[tokio::test]
async fn parser_failure_is_non_fatal_and_keeps_raw_text() {
    let gateway = Arc::new(ScriptedGateway::always_succeeds("this is not json"));
    let pipeline = build_pipeline(single_model_router(), gateway, 10, 1);

    let req = Request::new("parse me")
        .with_model(ModelId::new("test-model"))
        .with_parser(Arc::new(JsonParser));
    let response = pipeline.submit(req, Priority::Normal).await.unwrap();

    assert!(response.success);
    assert_eq!(response.text, "this is not json");
    let error = response.error.expect("parser failure should be recorded");
    assert_eq!(error.kind, ErrorKind::ParseError);
}

#[tokio::test]
async fn parser_success_leaves_response_untouched() {
    let gateway = Arc::new(ScriptedGateway::always_succeeds(r#"{"ok":true}"#));
    let pipeline = build_pipeline(single_model_router(), gateway, 10, 1);

    let req = Request::new("parse me")
        .with_model(ModelId::new("test-model"))
        .with_parser(Arc::new(JsonParser));
    let response = pipeline.submit(req, Priority::Normal).await.unwrap();

    assert!(response.success);
    assert!(response.error.is_none());
}
