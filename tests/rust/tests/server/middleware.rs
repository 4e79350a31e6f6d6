//! Tests: AccessLogLayer in front of a real axum server
//!
//! Validates that:
//! 1. X-Request-ID is echoed and becomes the request's trace_id
//! 2. Handlers see the captured request body unchanged
//! 3. Handler failures produce a 500 and are logged
//! 4. A body that fails after a partial write is logged with the bytes sent
//! 5. Elapsed time covers the handler, and HEAD requests log no error

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::error_handling::HandleErrorLayer;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream;
use pretty_assertions::assert_eq;
use scopelog_core::{must_extract, Logger, MemoryLogger};
use scopelog_http::{AccessLogLayer, BoxError, Failures, RequestContext, RequestTrace, REQUEST_ID_HEADER};
use serde_json::{json, Value};
use tests::{init_test_tracing, memory_logger, server, wait};
use tower::{service_fn, ServiceBuilder};

async fn echo(RequestContext(ctx): RequestContext, Json(body): Json<Value>) -> Json<Value> {
    let mut trace = RequestTrace::default();
    must_extract(&ctx).unmarshal(&mut trace).unwrap();
    Json(json!({"trace_id": trace.request_id, "received": body}))
}

async fn text() -> &'static str {
    "plain text"
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    Json(json!({"slept_ms": 50}))
}

async fn partial() -> Response {
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from("partial")),
        Err(std::io::Error::other("disk read failed")),
    ];
    Response::new(Body::from_stream(stream::iter(chunks)))
}

fn app(logger: Arc<MemoryLogger>) -> Router {
    let flaky = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|failures: Failures| async move { failures }))
        .layer(AccessLogLayer::new().with_logger(logger.clone()))
        .service(service_fn(|_request: axum::extract::Request| async move {
            Err::<Response, BoxError>("database unavailable".into())
        }));

    Router::new()
        .route("/echo", post(echo))
        .route("/text", get(text))
        .route("/partial", get(partial))
        .route("/slow", get(slow))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|failures: Failures| async move { failures }))
                .layer(AccessLogLayer::new().with_logger(logger)),
        )
        .route_service("/flaky", flaky)
}

#[tokio::test]
async fn test_request_id_echoed_and_traced() {
    init_test_tracing();
    let logger = memory_logger();
    let server = server::start(app(logger.clone())).await.unwrap();

    let response = reqwest::Client::new()
        .post(server.url("/echo"))
        .header(REQUEST_ID_HEADER, "req-123")
        .json(&json!({"a": 1}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-123");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"trace_id": "req-123", "received": {"a": 1}}));

    let logs = wait::access_logs(&logger, 1).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].path, "/echo");
    assert_eq!(logs[0].request.data_object, Some(json!({"a": 1})));
    assert_eq!(
        logs[0].response.data_object,
        Some(json!({"trace_id": "req-123", "received": {"a": 1}}))
    );
    assert_eq!(logs[0].error, "");

    let entry = &logger.entries()[0];
    let tracer = entry.tracer.as_ref().unwrap();
    assert_eq!(tracer["trace_id"], "req-123");
    assert!(tracer["correlation_id"].as_str().is_some_and(|ts| !ts.is_empty()));
}

#[tokio::test]
async fn test_text_response_logged_as_string() {
    let logger = memory_logger();
    let server = server::start(app(logger.clone())).await.unwrap();

    let response = reqwest::get(server.url("/text")).await.unwrap();
    assert_eq!(response.text().await.unwrap(), "plain text");

    let logs = wait::access_logs(&logger, 1).await;
    assert_eq!(logs[0].response.data_string, "plain text");
    assert_eq!(logs[0].response.data_object, None);
    assert!(logs[0].error.contains("response body is invalid json"));
    // No X-Request-ID sent: nothing echoed
    assert_eq!(logs[0].response.header.get(REQUEST_ID_HEADER), None);
}

#[tokio::test]
async fn test_handler_failure_becomes_500() {
    let logger = memory_logger();
    let server = server::start(app(logger.clone())).await.unwrap();

    let response = reqwest::Client::new()
        .get(server.url("/flaky"))
        .header(REQUEST_ID_HEADER, "req-flaky")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-flaky");
    assert_eq!(response.text().await.unwrap(), "internal server error");

    let logs = wait::access_logs(&logger, 1).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].path, "/flaky");
    assert_eq!(logs[0].error, "database unavailable");
}

#[tokio::test]
async fn test_partial_write_then_failure() {
    let logger = memory_logger();
    let server = server::start(app(logger.clone())).await.unwrap();

    // The connection is cut mid-body, possibly before the head was flushed
    if let Ok(response) = reqwest::get(server.url("/partial")).await {
        assert_eq!(response.status().as_u16(), 200);
        assert!(response.bytes().await.is_err());
    }

    let logs = wait::access_logs(&logger, 1).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].response.data_string, "partial");
    assert!(logs[0].error.contains("disk read failed"));
}

#[tokio::test]
async fn test_elapsed_time_covers_handler() {
    let logger = memory_logger();
    let server = server::start(app(logger.clone())).await.unwrap();

    let response = reqwest::get(server.url("/slow")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    response.bytes().await.unwrap();

    let logs = wait::access_logs(&logger, 1).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].response.data_object, Some(json!({"slept_ms": 50})));
    assert!(logs[0].elapsed_time >= 50, "elapsed {}", logs[0].elapsed_time);
}

#[tokio::test]
async fn test_head_request_logs_no_error() {
    let logger = memory_logger();
    let server = server::start(app(logger.clone())).await.unwrap();

    let response = reqwest::Client::new()
        .head(server.url("/text"))
        .header(REQUEST_ID_HEADER, "req-head")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-head");

    let logs = wait::access_logs(&logger, 1).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].path, "/text");
    assert_eq!(logs[0].error, "");
}

#[tokio::test]
async fn test_handler_logs_share_request_trace() {
    let logger = memory_logger();
    let handler_logger = logger.clone();
    let router = Router::new()
        .route(
            "/work",
            get(move |RequestContext(ctx): RequestContext| async move {
                handler_logger.info(&ctx, "doing work", &[]);
                "done"
            }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(|failures: Failures| async move { failures }))
                .layer(AccessLogLayer::new().with_logger(logger.clone())),
        );
    let server = server::start(router).await.unwrap();

    reqwest::Client::new()
        .get(server.url("/work"))
        .header(REQUEST_ID_HEADER, "req-shared")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    wait::access_logs(&logger, 1).await;
    let entries = logger.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message, "doing work");
    assert_eq!(entries[0].tracer, entries[1].tracer);
    assert_eq!(entries[1].tracer.as_ref().unwrap()["trace_id"], "req-shared");
}
