//! # Scopelog HTTP
//!
//! Access logging for HTTP traffic on both sides of a service.
//!
//! ## Modules
//!
//! - `client` - [`ClientTracer`], a logging wrapper around any [`RoundTrip`]
//! - `server` - [`AccessLogLayer`], tower middleware for inbound requests
//! - `capture` - Body capture without consuming the body
//! - `assembler` - Turns captures into [`AccessLogData`](scopelog_core::AccessLogData)
//! - `failure` - Ordered failure aggregation
//!
//! ## Server usage
//!
//! ```no_run
//! use axum::{error_handling::HandleErrorLayer, routing::get, Router};
//! use scopelog_core::Logger;
//! use scopelog_http::{AccessLogLayer, Failures, RequestContext};
//! use tower::ServiceBuilder;
//!
//! async fn hello(RequestContext(ctx): RequestContext) -> &'static str {
//!     scopelog_core::TracingLogger::new().info(&ctx, "saying hello", &[]);
//!     "hello"
//! }
//!
//! let app: Router = Router::new().route("/", get(hello)).layer(
//!     ServiceBuilder::new()
//!         .layer(HandleErrorLayer::new(|failures: Failures| async move { failures }))
//!         .layer(AccessLogLayer::new()),
//! );
//! ```

pub mod assembler;
pub mod capture;
pub mod client;
pub mod failure;
pub mod server;

pub use assembler::{AccessLogAssembler, HttpCapture};
pub use capture::{capture_body, simple_headers, CapturedBody, TeeBody, TeeOutcome};
pub use client::{ClientTracer, RoundTrip};
pub use failure::{BoxError, Failure, FailureKind, Failures, Side};
pub use server::{AccessLog, AccessLogLayer, RequestContext, RequestTrace, REQUEST_ID_HEADER};
