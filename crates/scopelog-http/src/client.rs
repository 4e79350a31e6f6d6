//! Outbound call instrumentation
//!
//! [`ClientTracer`] wraps any [`RoundTrip`] and emits one access log per
//! call. The caller gets back exactly what the wrapped transport returned;
//! capture problems only show up in the log.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use http::{Request, Response};
use http_body_util::BodyExt;
use scopelog_core::{Context, Logger};
use tracing::warn;

use crate::assembler::{AccessLogAssembler, HttpCapture};
use crate::capture::capture_body;
use crate::failure::{BoxError, Failure, Failures};

/// Performs one HTTP exchange
#[async_trait]
pub trait RoundTrip: Send + Sync {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, BoxError>;
}

#[async_trait]
impl<T: RoundTrip + ?Sized> RoundTrip for Arc<T> {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, BoxError> {
        (**self).round_trip(request).await
    }
}

#[async_trait]
impl RoundTrip for reqwest::Client {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, BoxError> {
        let (parts, body) = request.into_parts();
        let body = body.collect().await?.to_bytes();

        let mut builder = self
            .request(parts.method, parts.uri.to_string())
            .version(parts.version)
            .headers(parts.headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();

        let mut out = Response::new(Body::from_stream(response.bytes_stream()));
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }
}

/// Access-logging wrapper around a [`RoundTrip`].
///
/// The request's [`Context`] is read from its extensions; the background
/// context is used when none is attached.
#[derive(Debug, Clone)]
pub struct ClientTracer<T = reqwest::Client> {
    inner: T,
    assembler: AccessLogAssembler,
}

impl Default for ClientTracer<reqwest::Client> {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl<T: RoundTrip> ClientTracer<T> {
    /// Wrap `inner`, logging through `tracing`
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            assembler: AccessLogAssembler::default(),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.assembler = AccessLogAssembler::new(logger);
        self
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Attach `ctx` to `request` and perform it
    pub async fn send(
        &self,
        ctx: &Context,
        mut request: Request<Body>,
    ) -> Result<Response<Body>, BoxError> {
        request.extensions_mut().insert(ctx.clone());
        self.round_trip(request).await
    }
}

#[async_trait]
impl<T: RoundTrip> RoundTrip for ClientTracer<T> {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, BoxError> {
        let started = Instant::now();
        let ctx = request
            .extensions()
            .get::<Context>()
            .cloned()
            .unwrap_or_default();
        let mut failures = Failures::new();

        let (parts, body) = request.into_parts();
        let path = parts.uri.to_string();
        let captured = capture_body(body).await;
        if let Some(e) = captured.error {
            warn!(path = %path, error = %e, "Failed to read request body");
            failures.push(Failure::RequestBody(e));
        }
        let request_capture = HttpCapture::new(&parts.headers, captured.bytes);
        let request = Request::from_parts(parts, captured.body);

        let (result, response_capture) = match self.inner.round_trip(request).await {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                let captured = capture_body(body).await;
                if let Some(e) = captured.error {
                    warn!(path = %path, error = %e, "Failed to read response body");
                    failures.push(Failure::ResponseBody(e));
                }
                let capture = HttpCapture::new(&parts.headers, captured.bytes);
                (Ok(Response::from_parts(parts, captured.body)), capture)
            }
            Err(e) => {
                failures.push(Failure::Transport(e.to_string()));
                (Err(e), HttpCapture::default())
            }
        };

        self.assembler.emit(
            &ctx,
            path,
            request_capture,
            response_capture,
            &mut failures,
            started,
        );
        result
    }
}
