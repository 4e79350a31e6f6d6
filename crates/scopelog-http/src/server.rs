//! Inbound request instrumentation
//!
//! [`AccessLogLayer`] wraps a tower service handling `Request<Body>`:
//! - builds a [`RequestTrace`] from `X-Request-ID` and the arrival time and
//!   injects it into the request's [`Context`]
//! - captures the request body and replays it to the handler
//! - echoes `X-Request-ID` on the response
//! - mirrors the response body as it streams and emits one access log when
//!   it ends, fails or is dropped
//!
//! Handlers read the context with the [`RequestContext`] extractor.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::FromRequestParts;
use chrono::{SecondsFormat, Utc};
use futures::future::BoxFuture;
use http::request::Parts;
use http::{HeaderMap, HeaderValue, Method, Request, Response};
use http_body::Body as HttpBody;
use scopelog_core::{inject, trace_record, Context, Logger, Tracer, TracerConfig};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::assembler::{AccessLogAssembler, HttpCapture};
use crate::capture::{capture_body, TeeBody, TeeOutcome};
use crate::failure::{BoxError, Failure, Failures};

/// Request header carrying the caller's request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

trace_record! {
    /// Trace fields attached to every inbound request
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RequestTrace {
        #[trace(tracer = "trace_id")]
        pub request_id: String,
        #[trace(tracer = "correlation_id")]
        pub timestamp: String,
    }
}

impl RequestTrace {
    /// Trace for a request arriving now
    pub fn now(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
        }
    }
}

/// Layer producing [`AccessLog`] services
#[derive(Debug, Clone, Default)]
pub struct AccessLogLayer {
    assembler: AccessLogAssembler,
    config: TracerConfig,
}

impl AccessLogLayer {
    /// Log through `tracing`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.assembler = AccessLogAssembler::new(logger);
        self
    }

    /// Read [`RequestTrace`] annotations under a different tag
    pub fn with_tracer_config(mut self, config: TracerConfig) -> Self {
        self.config = config;
        self
    }
}

impl<S> Layer<S> for AccessLogLayer {
    type Service = AccessLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessLog {
            inner,
            assembler: self.assembler.clone(),
            config: Arc::new(self.config.clone()),
        }
    }
}

/// Access-logging service. Fails with [`Failures`].
#[derive(Debug, Clone)]
pub struct AccessLog<S> {
    inner: S,
    assembler: AccessLogAssembler,
    config: Arc<TracerConfig>,
}

impl<S, B> Service<Request<Body>> for AccessLog<S>
where
    S: Service<Request<Body>, Response = Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response<TeeBody>;
    type Error = Failures;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(|e| Failures::from(Failure::Handler(e.into())))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // The readied service goes into the future; a clone stays behind
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let assembler = self.assembler.clone();
        let config = self.config.clone();
        Box::pin(handle(inner, assembler, config, request))
    }
}

async fn handle<S, B>(
    mut inner: S,
    assembler: AccessLogAssembler,
    config: Arc<TracerConfig>,
    request: Request<Body>,
) -> Result<Response<TeeBody>, Failures>
where
    S: Service<Request<Body>, Response = Response<B>>,
    S::Error: Into<BoxError>,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let request_id = request_id(request.headers());
    let echoed = (!request_id.is_empty())
        .then(|| HeaderValue::from_str(&request_id).ok())
        .flatten();
    let with_request_id = |failures: Failures| match &echoed {
        Some(value) => failures.with_request_id(value.clone()),
        None => failures,
    };

    let tracer = Tracer::with_config(&RequestTrace::now(request_id.clone()), &config)
        .map_err(|e| {
            warn!(error = %e, "Cannot build request trace");
            with_request_id(Failures::from(Failure::Tracer(e)))
        })?;
    let parent = request
        .extensions()
        .get::<Context>()
        .cloned()
        .unwrap_or_default();
    let ctx = inject(&parent, tracer);

    let (mut parts, body) = request.into_parts();
    parts.extensions.insert(ctx.clone());
    let path = parts.uri.path().to_string();
    // HEAD responses are never written, so their body is never polled
    let bodiless = parts.method == Method::HEAD;

    let mut failures = Failures::new();
    let captured = capture_body(body).await;
    if let Some(e) = captured.error {
        warn!(path = %path, error = %e, "Failed to read request body");
        failures.push(Failure::RequestBody(e));
    }
    let request_capture = HttpCapture::new(&parts.headers, captured.bytes);
    let request = Request::from_parts(parts, captured.body);

    debug!(path = %path, request_id = %request_id, "Handling request");

    let response = match inner.call(request).await {
        Ok(response) => response,
        Err(e) => {
            failures.push(Failure::Handler(e.into()));
            assembler.emit(
                &ctx,
                path,
                request_capture,
                HttpCapture::default(),
                &mut failures,
                started,
            );
            return Err(with_request_id(failures.into_errors()));
        }
    };

    let (mut parts, body) = response.into_parts();
    if let Some(value) = &echoed {
        if !parts.headers.contains_key(REQUEST_ID_HEADER) {
            parts.headers.insert(REQUEST_ID_HEADER, value.clone());
        }
    }

    let pending = PendingLog {
        assembler,
        ctx,
        path,
        request: request_capture,
        response_header: parts.headers.clone(),
        failures,
        started,
        bodiless,
    };

    if pending.failures.has_errors() {
        // Request capture already failed: finish the exchange here and
        // report instead of streaming
        let captured = capture_body(body).await;
        let outcome = match captured.error {
            Some(e) => TeeOutcome::Failed(e),
            None => TeeOutcome::Complete,
        };
        return Err(with_request_id(
            pending.finish(captured.bytes, outcome).into_errors(),
        ));
    }

    let body = TeeBody::new(Body::new(body), move |bytes, outcome| {
        pending.finish(bytes, outcome).into_errors()
    });
    Ok(Response::from_parts(parts, body))
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Everything needed to emit the access log once the response body is done
struct PendingLog {
    assembler: AccessLogAssembler,
    ctx: Context,
    path: String,
    request: HttpCapture,
    response_header: HeaderMap,
    failures: Failures,
    started: Instant,
    bodiless: bool,
}

impl PendingLog {
    fn finish(self, body: Bytes, outcome: TeeOutcome) -> Failures {
        let PendingLog {
            assembler,
            ctx,
            path,
            request,
            response_header,
            mut failures,
            started,
            bodiless,
        } = self;

        match outcome {
            TeeOutcome::Complete => {}
            TeeOutcome::Failed(e) => failures.push(Failure::Handler(e)),
            TeeOutcome::Dropped if bodiless => {}
            TeeOutcome::Dropped => {
                debug!(path = %path, "Response body dropped before completion");
                failures.push(Failure::Cancelled);
            }
        }

        let response = HttpCapture {
            header: response_header,
            body,
        };
        assembler.emit(&ctx, path, request, response, &mut failures, started);
        failures
    }
}

/// Extractor for the request's [`Context`]. Background when the request did
/// not pass through [`AccessLogLayer`].
#[derive(Debug, Clone, Default)]
pub struct RequestContext(pub Context);

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<Context>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

impl std::ops::Deref for RequestContext {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.0
    }
}
