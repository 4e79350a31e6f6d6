//! Body capture
//!
//! Two ways to observe a body without taking it away from its consumer:
//! - [`capture_body`] reads the body fully and hands back a replayable copy
//! - [`TeeBody`] forwards frames as they are polled and mirrors their bytes
//!   into a buffer, calling a completion hook exactly once

use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::{Body, Bytes};
use http::HeaderMap;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;

use crate::failure::{BoxError, Failures};

/// Result of reading a body fully
pub struct CapturedBody {
    /// Bytes read. Empty if the read failed.
    pub bytes: Bytes,
    /// Replacement body yielding the same bytes
    pub body: Body,
    pub error: Option<BoxError>,
}

impl std::fmt::Debug for CapturedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedBody")
            .field("bytes", &self.bytes)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Read `body` to the end and return its bytes with a replacement body.
///
/// A body known to be empty is not polled. On a read failure the bytes are
/// empty, the replacement body is empty and the error is returned alongside.
pub async fn capture_body<B>(body: B) -> CapturedBody
where
    B: HttpBody<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    if body.size_hint().exact() == Some(0) {
        return CapturedBody {
            bytes: Bytes::new(),
            body: Body::empty(),
            error: None,
        };
    }

    match body.collect().await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            CapturedBody {
                body: Body::from(bytes.clone()),
                bytes,
                error: None,
            }
        }
        Err(e) => CapturedBody {
            bytes: Bytes::new(),
            body: Body::empty(),
            error: Some(e.into()),
        },
    }
}

/// Flatten a header map into name -> values joined with a single space
pub fn simple_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(" ");
            (name.as_str().to_string(), joined)
        })
        .collect()
}

/// How a tee'd body finished
#[derive(Debug)]
pub enum TeeOutcome {
    /// All frames were delivered
    Complete,
    /// The inner body yielded an error
    Failed(BoxError),
    /// Dropped before reaching the end
    Dropped,
}

type OnFinish = Box<dyn FnOnce(Bytes, TeeOutcome) -> Failures + Send>;

/// Body that forwards every frame and mirrors data frames into a buffer.
///
/// The hook receives the mirrored bytes and the outcome. On
/// [`TeeOutcome::Failed`] the failures it returns become the body's error.
pub struct TeeBody {
    inner: Body,
    buffer: Vec<u8>,
    on_finish: Option<OnFinish>,
}

impl TeeBody {
    pub fn new<F>(inner: Body, on_finish: F) -> Self
    where
        F: FnOnce(Bytes, TeeOutcome) -> Failures + Send + 'static,
    {
        Self {
            inner,
            buffer: Vec::new(),
            on_finish: Some(Box::new(on_finish)),
        }
    }

    /// Bytes mirrored so far
    pub fn captured(&self) -> &[u8] {
        &self.buffer
    }

    fn finish(&mut self, outcome: TeeOutcome) -> Option<Failures> {
        let on_finish = self.on_finish.take()?;
        let bytes = Bytes::from(std::mem::take(&mut self.buffer));
        Some(on_finish(bytes, outcome))
    }
}

impl HttpBody for TeeBody {
    type Data = Bytes;
    type Error = Failures;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.buffer.extend_from_slice(data);
                }
                // Servers stop polling once the body reports its end
                if this.inner.is_end_stream() {
                    this.finish(TeeOutcome::Complete);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => {
                let failures = this
                    .finish(TeeOutcome::Failed(e.into()))
                    .unwrap_or_default();
                Poll::Ready(Some(Err(failures)))
            }
            None => {
                this.finish(TeeOutcome::Complete);
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for TeeBody {
    fn drop(&mut self) {
        let outcome = if self.inner.is_end_stream() {
            TeeOutcome::Complete
        } else {
            TeeOutcome::Dropped
        };
        self.finish(outcome);
    }
}

impl std::fmt::Debug for TeeBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeeBody")
            .field("captured", &self.buffer.len())
            .field("finished", &self.on_finish.is_none())
            .finish()
    }
}
