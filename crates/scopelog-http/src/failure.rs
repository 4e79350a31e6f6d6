//! Aggregated failures of one instrumented call
//!
//! Everything that goes wrong while a call is captured (body reads, the call
//! itself, the handler, JSON diagnostics) is collected in order into one
//! [`Failures`] value. Its display form is the access log's `error` string.

use std::fmt;

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use scopelog_core::TracerError;
use thiserror::Error;

/// Boxed error used at transport and handler boundaries
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Side of an HTTP exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Request,
    Response,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Request => f.write_str("request"),
            Side::Response => f.write_str("response"),
        }
    }
}

/// Discriminant of [`Failure`], for membership tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    RequestBody,
    ResponseBody,
    InvalidJson,
    Transport,
    Handler,
    Tracer,
    Cancelled,
}

/// A single failure
#[derive(Error, Debug)]
pub enum Failure {
    #[error("error read request body: {0}")]
    RequestBody(BoxError),

    #[error("error read response body: {0}")]
    ResponseBody(BoxError),

    /// Non-empty body that is not JSON. Diagnostic only.
    #[error("{side} body is invalid json: {error}")]
    InvalidJson { side: Side, error: serde_json::Error },

    /// The outbound call failed; holds the rendered error because the
    /// error value itself goes back to the caller untouched
    #[error("error doing actual request: {0}")]
    Transport(String),

    /// The wrapped handler reported an error
    #[error("{0}")]
    Handler(BoxError),

    #[error("cannot inject propagation data: {0}")]
    Tracer(#[from] TracerError),

    #[error("response body dropped before completion")]
    Cancelled,
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::RequestBody(_) => FailureKind::RequestBody,
            Failure::ResponseBody(_) => FailureKind::ResponseBody,
            Failure::InvalidJson { .. } => FailureKind::InvalidJson,
            Failure::Transport(_) => FailureKind::Transport,
            Failure::Handler(_) => FailureKind::Handler,
            Failure::Tracer(_) => FailureKind::Tracer,
            Failure::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// Ordered sequence of failures
///
/// On the server side it also remembers the request's `X-Request-ID`, so the
/// error response can echo it.
#[derive(Debug, Default)]
pub struct Failures {
    failures: Vec<Failure>,
    request_id: Option<HeaderValue>,
}

impl Failures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure: impl Into<Failure>) {
        self.failures.push(failure.into());
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Failure> {
        self.failures.iter()
    }

    pub fn contains(&self, kind: FailureKind) -> bool {
        self.failures.iter().any(|f| f.kind() == kind)
    }

    /// Whether anything other than JSON diagnostics was recorded
    pub fn has_errors(&self) -> bool {
        self.failures
            .iter()
            .any(|f| f.kind() != FailureKind::InvalidJson)
    }

    /// Drop JSON diagnostics, keeping the failures a caller has to act on
    pub fn into_errors(self) -> Failures {
        Self {
            failures: self
                .failures
                .into_iter()
                .filter(|f| f.kind() != FailureKind::InvalidJson)
                .collect(),
            request_id: self.request_id,
        }
    }

    /// Request id echoed by [`IntoResponse`]
    pub fn with_request_id(mut self, request_id: HeaderValue) -> Self {
        self.request_id = Some(request_id);
        self
    }

    pub fn request_id(&self) -> Option<&HeaderValue> {
        self.request_id.as_ref()
    }

    /// All failures joined with `"; "`, empty when there are none
    pub fn flatten(&self) -> String {
        self.to_string()
    }

    pub fn into_vec(self) -> Vec<Failure> {
        self.failures
    }
}

impl fmt::Display for Failures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for Failures {}

impl From<Failure> for Failures {
    fn from(failure: Failure) -> Self {
        Self {
            failures: vec![failure],
            request_id: None,
        }
    }
}

impl IntoIterator for Failures {
    type Item = Failure;
    type IntoIter = std::vec::IntoIter<Failure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.into_iter()
    }
}

impl<'a> IntoIterator for &'a Failures {
    type Item = &'a Failure;
    type IntoIter = std::slice::Iter<'a, Failure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.iter()
    }
}

/// Plain 500 without details, for use behind `HandleErrorLayer`. Carries
/// `x-request-id` when one was recorded.
impl IntoResponse for Failures {
    fn into_response(self) -> Response {
        let mut response =
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response();
        if let Some(request_id) = self.request_id {
            response.headers_mut().insert("x-request-id", request_id);
        }
        response
    }
}
