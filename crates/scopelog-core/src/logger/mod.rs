//! Structured logger capability
//!
//! Every emission path goes through [`Logger`]. Two implementations ship
//! with the crate:
//! - [`TracingLogger`]: forwards to `tracing`, attaching the context's trace
//!   fields as a nested object
//! - [`MemoryLogger`]: keeps entries in memory for tests and embedding

mod memory;
mod tracing_logger;

pub use memory::{LogEntry, MemoryLogger};
pub use tracing_logger::TracingLogger;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::access::AccessLogData;
use crate::context::Context;

/// Tag of access log events
pub const TAG_ACCESS_LOG: &str = "access_log";
/// Tag of leveled (debug/info/warn/error) events
pub const TAG_SYS: &str = "sys";

/// Leveled logging plus one access log call
pub trait Logger: Send + Sync {
    fn debug(&self, ctx: &Context, msg: &str, fields: &[KeyValue]);

    fn info(&self, ctx: &Context, msg: &str, fields: &[KeyValue]);

    fn warn(&self, ctx: &Context, msg: &str, fields: &[KeyValue]);

    fn error(&self, ctx: &Context, msg: &str, fields: &[KeyValue]);

    fn access(&self, ctx: &Context, data: &AccessLogData);
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn debug(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        (**self).debug(ctx, msg, fields)
    }

    fn info(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        (**self).info(ctx, msg, fields)
    }

    fn warn(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        (**self).warn(ctx, msg, fields)
    }

    fn error(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        (**self).error(ctx, msg, fields)
    }

    fn access(&self, ctx: &Context, data: &AccessLogData) {
        (**self).access(ctx, data)
    }
}

/// Ad hoc structured field passed to a leveled log call
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    key: String,
    value: Value,
}

impl KeyValue {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Build a [`KeyValue`]. A value that fails to serialize is logged as a
/// string describing the failure.
pub fn kv(key: impl Into<String>, value: impl Serialize) -> KeyValue {
    let value = serde_json::to_value(value)
        .unwrap_or_else(|e| Value::String(format!("unserializable value: {}", e)));
    KeyValue {
        key: key.into(),
        value,
    }
}

/// Fields as one JSON object, `None` when there are none
pub(crate) fn fields_object(fields: &[KeyValue]) -> Option<Value> {
    if fields.is_empty() {
        return None;
    }
    let map = fields
        .iter()
        .map(|f| (f.key.clone(), f.value.clone()))
        .collect();
    Some(Value::Object(map))
}
