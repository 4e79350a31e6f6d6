//! Request-scoped context carrying a trace field set
//!
//! A [`Context`] is cheap to clone and never mutated: binding a tracer
//! derives a new context and leaves the original as it was. The tracer slot
//! is private, so the only way in or out is [`inject`] / [`extract`].

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::tracer::Tracer;

/// Opaque request-scoped value
#[derive(Clone, Default)]
pub struct Context {
    tracer: Option<Arc<Tracer>>,
}

impl Context {
    /// Root context carrying nothing
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context carrying `tracer`, replacing any tracer bound to
    /// `self` in the derived copy only
    pub fn with_tracer(&self, tracer: impl Into<Arc<Tracer>>) -> Self {
        Self {
            tracer: Some(tracer.into()),
        }
    }

    /// The bound tracer, if any
    pub fn tracer(&self) -> Option<&Arc<Tracer>> {
        self.tracer.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("tracer", &self.tracer.as_ref().map(|t| t.to_json()))
            .finish()
    }
}

fn empty_tracer() -> Arc<Tracer> {
    static EMPTY: OnceLock<Arc<Tracer>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::new(Tracer::empty())).clone()
}

/// Bind `tracer` to a context derived from `ctx`
pub fn inject(ctx: &Context, tracer: impl Into<Arc<Tracer>>) -> Context {
    ctx.with_tracer(tracer)
}

/// Read the tracer bound to `ctx`.
///
/// Returns `false` together with a shared empty tracer when nothing was
/// injected; absence is not an error.
pub fn extract(ctx: &Context) -> (Arc<Tracer>, bool) {
    match &ctx.tracer {
        Some(tracer) => (Arc::clone(tracer), true),
        None => (empty_tracer(), false),
    }
}

/// [`extract`] without the found flag
pub fn must_extract(ctx: &Context) -> Arc<Tracer> {
    extract(ctx).0
}
