//! In-memory logger

use parking_lot::Mutex;
use serde_json::Value;
use tracing::Level;

use super::{KeyValue, Logger, TAG_ACCESS_LOG, TAG_SYS};
use crate::access::AccessLogData;
use crate::context::{extract, Context};

/// One recorded log call
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: Level,
    pub tag: &'static str,
    pub message: String,
    /// Trace fields of the context, when a tracer was injected
    pub tracer: Option<Value>,
    pub fields: Vec<KeyValue>,
    pub access: Option<AccessLogData>,
}

/// Logger that records every call in order
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded entries
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Recorded access log events, in emission order
    pub fn access_logs(&self) -> Vec<AccessLogData> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| e.access.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn record(&self, level: Level, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        let entry = LogEntry {
            level,
            tag: TAG_SYS,
            message: msg.to_string(),
            tracer: tracer_json(ctx),
            fields: fields.to_vec(),
            access: None,
        };
        self.entries.lock().push(entry);
    }
}

fn tracer_json(ctx: &Context) -> Option<Value> {
    let (tracer, found) = extract(ctx);
    found.then(|| tracer.to_json())
}

impl Logger for MemoryLogger {
    fn debug(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        self.record(Level::DEBUG, ctx, msg, fields);
    }

    fn info(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        self.record(Level::INFO, ctx, msg, fields);
    }

    fn warn(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        self.record(Level::WARN, ctx, msg, fields);
    }

    fn error(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        self.record(Level::ERROR, ctx, msg, fields);
    }

    fn access(&self, ctx: &Context, data: &AccessLogData) {
        let entry = LogEntry {
            level: Level::INFO,
            tag: TAG_ACCESS_LOG,
            message: TAG_ACCESS_LOG.to_string(),
            tracer: tracer_json(ctx),
            fields: Vec::new(),
            access: Some(data.clone()),
        };
        self.entries.lock().push(entry);
    }
}
