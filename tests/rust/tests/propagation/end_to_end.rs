//! Test: one inbound request fanning out to a downstream service
//!
//! The inbound access log, the handler's own log and the outbound access log
//! all carry the trace fields derived from the inbound X-Request-ID.

use std::sync::Arc;

use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use scopelog_core::{kv, Logger, MemoryLogger, TAG_ACCESS_LOG, TAG_SYS};
use scopelog_http::{AccessLogLayer, ClientTracer, Failures, RequestContext, REQUEST_ID_HEADER};
use serde_json::{json, Value};
use tests::{init_test_tracing, memory_logger, server, wait};
use tower::ServiceBuilder;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Clone)]
struct AppState {
    logger: Arc<MemoryLogger>,
    client: Arc<ClientTracer>,
    downstream: String,
}

async fn checkout(
    State(state): State<AppState>,
    RequestContext(ctx): RequestContext,
) -> Result<String, StatusCode> {
    state
        .logger
        .info(&ctx, "pricing cart", &[kv("items", 3)]);

    let request = Request::get(format!("{}/prices", state.downstream))
        .body(Body::empty())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let response = state
        .client
        .send(&ctx, request)
        .await
        .map_err(|_| StatusCode::BAD_GATEWAY)?;
    let bytes = response
        .into_body()
        .collect()
        .await
        .map_err(|_| StatusCode::BAD_GATEWAY)?
        .to_bytes();

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn test_trace_fields_flow_to_outbound_calls() -> anyhow::Result<()> {
    init_test_tracing();
    let downstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 30})))
        .expect(1)
        .mount(&downstream)
        .await;

    let logger = memory_logger();
    let state = AppState {
        logger: logger.clone(),
        client: Arc::new(ClientTracer::default().with_logger(logger.clone())),
        downstream: downstream.uri(),
    };
    let router = Router::new()
        .route("/checkout", get(checkout))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|failures: Failures| async move { failures }))
                .layer(AccessLogLayer::new().with_logger(logger.clone())),
        );
    let server = server::start(router).await?;

    let body = reqwest::Client::new()
        .get(server.url("/checkout"))
        .header(REQUEST_ID_HEADER, "order-77")
        .send()
        .await?
        .text()
        .await?;
    assert_eq!(body, r#"{"total":30}"#);

    let logs = wait::access_logs(&logger, 2).await;
    assert_eq!(logs.len(), 2);

    // Outbound call finishes first, inbound log is emitted when its body ends
    assert_eq!(logs[0].path, format!("{}/prices", downstream.uri()));
    assert_eq!(logs[0].response.data_object, Some(json!({"total": 30})));
    assert_eq!(logs[1].path, "/checkout");
    assert_eq!(logs[1].response.data_object, Some(json!({"total": 30})));

    let entries = logger.entries();
    let tags: Vec<&str> = entries.iter().map(|e| e.tag).collect();
    assert_eq!(tags, vec![TAG_SYS, TAG_ACCESS_LOG, TAG_ACCESS_LOG]);

    let trace_ids: Vec<Value> = entries
        .iter()
        .map(|e| e.tracer.as_ref().unwrap()["trace_id"].clone())
        .collect();
    assert_eq!(trace_ids, vec![json!("order-77"); 3]);
    Ok(())
}

#[tokio::test]
async fn test_missing_request_id_still_traces() -> anyhow::Result<()> {
    let downstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("n/a"))
        .mount(&downstream)
        .await;

    let logger = memory_logger();
    let state = AppState {
        logger: logger.clone(),
        client: Arc::new(ClientTracer::default().with_logger(logger.clone())),
        downstream: downstream.uri(),
    };
    let router = Router::new()
        .route("/checkout", get(checkout))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|failures: Failures| async move { failures }))
                .layer(AccessLogLayer::new().with_logger(logger.clone())),
        );
    let server = server::start(router).await?;

    let response = reqwest::get(server.url("/checkout")).await?;
    assert!(response.headers().get(REQUEST_ID_HEADER).is_none());
    assert_eq!(response.text().await?, "n/a");

    wait::access_logs(&logger, 2).await;
    for entry in logger.entries() {
        let tracer = entry.tracer.expect("every entry carries the request trace");
        assert_eq!(tracer["trace_id"], "");
        assert!(tracer["correlation_id"].as_str().is_some_and(|ts| ts.ends_with('Z')));
    }
    Ok(())
}
