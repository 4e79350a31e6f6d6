//! Access log assembly and emission

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use http::HeaderMap;
use scopelog_core::{AccessLogData, Context, HttpData, Logger, TracingLogger};
use serde_json::Value;
use tracing::debug;

use crate::capture::simple_headers;
use crate::failure::{Failure, Failures, Side};

/// Raw capture of one side of an exchange
#[derive(Debug, Clone, Default)]
pub struct HttpCapture {
    pub header: HeaderMap,
    pub body: Bytes,
}

impl HttpCapture {
    pub fn new(header: &HeaderMap, body: Bytes) -> Self {
        Self {
            header: header.clone(),
            body,
        }
    }

    /// Convert into logged form.
    ///
    /// A non-empty body that parses as JSON goes to `data_object` only;
    /// otherwise it is kept as text and the parse error is returned.
    pub fn into_http_data(self) -> (HttpData, Option<serde_json::Error>) {
        let header = simple_headers(&self.header);
        if self.body.is_empty() {
            let data = HttpData {
                header,
                ..Default::default()
            };
            return (data, None);
        }

        match serde_json::from_slice::<Value>(&self.body) {
            Ok(object) => {
                let data = HttpData {
                    header,
                    data_object: Some(object),
                    data_string: String::new(),
                };
                (data, None)
            }
            Err(e) => {
                let data = HttpData {
                    header,
                    data_object: None,
                    data_string: String::from_utf8_lossy(&self.body).into_owned(),
                };
                (data, Some(e))
            }
        }
    }
}

/// Builds [`AccessLogData`] from captures and hands it to a [`Logger`]
#[derive(Clone)]
pub struct AccessLogAssembler {
    logger: Arc<dyn Logger>,
}

impl Default for AccessLogAssembler {
    fn default() -> Self {
        Self::new(Arc::new(TracingLogger::new()))
    }
}

impl std::fmt::Debug for AccessLogAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLogAssembler").finish_non_exhaustive()
    }
}

impl AccessLogAssembler {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Assemble and emit one access log event.
    ///
    /// JSON diagnostics for both bodies are appended to `failures`, so the
    /// caller sees the same list that was logged. Elapsed time is measured
    /// from `started` to now.
    pub fn emit(
        &self,
        ctx: &Context,
        path: String,
        request: HttpCapture,
        response: HttpCapture,
        failures: &mut Failures,
        started: Instant,
    ) -> AccessLogData {
        let (request, request_json) = request.into_http_data();
        let (response, response_json) = response.into_http_data();
        if let Some(error) = request_json {
            failures.push(Failure::InvalidJson {
                side: Side::Request,
                error,
            });
        }
        if let Some(error) = response_json {
            failures.push(Failure::InvalidJson {
                side: Side::Response,
                error,
            });
        }

        let data = AccessLogData {
            path,
            request,
            response,
            error: failures.flatten(),
            elapsed_time: elapsed_millis(started.elapsed()),
        };

        debug!(
            path = %data.path,
            elapsed_ms = data.elapsed_time,
            failures = failures.len(),
            "Emitting access log"
        );
        self.logger.access(ctx, &data);
        data
    }
}

fn elapsed_millis(elapsed: Duration) -> i64 {
    i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
}
