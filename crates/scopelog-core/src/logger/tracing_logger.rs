//! `tracing` backed logger

use tracing::{debug, error, info, warn};

use super::{fields_object, KeyValue, Logger, TAG_ACCESS_LOG, TAG_SYS};
use crate::access::AccessLogData;
use crate::context::{extract, Context};

/// Logger forwarding to the `tracing` macros.
///
/// Each event carries `tag`, plus `tracer` (the context's trace fields, only
/// when a tracer was injected) and `fields` (the extra key-values, only when
/// there are any). Access events are logged at info level with the message
/// `access_log` and the record in `data`. `tracer`, `fields` and `data` are
/// JSON-encoded strings, since `tracing` records flat values.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

fn tracer_field(ctx: &Context) -> Option<String> {
    let (tracer, found) = extract(ctx);
    found.then(|| tracer.to_json().to_string())
}

fn extra_fields(fields: &[KeyValue]) -> Option<String> {
    fields_object(fields).map(|v| v.to_string())
}

impl Logger for TracingLogger {
    fn debug(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        let tracer = tracer_field(ctx);
        let fields = extra_fields(fields);
        debug!(
            tag = TAG_SYS,
            tracer = tracer.as_deref(),
            fields = fields.as_deref(),
            "{}",
            msg
        );
    }

    fn info(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        let tracer = tracer_field(ctx);
        let fields = extra_fields(fields);
        info!(
            tag = TAG_SYS,
            tracer = tracer.as_deref(),
            fields = fields.as_deref(),
            "{}",
            msg
        );
    }

    fn warn(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        let tracer = tracer_field(ctx);
        let fields = extra_fields(fields);
        warn!(
            tag = TAG_SYS,
            tracer = tracer.as_deref(),
            fields = fields.as_deref(),
            "{}",
            msg
        );
    }

    fn error(&self, ctx: &Context, msg: &str, fields: &[KeyValue]) {
        let tracer = tracer_field(ctx);
        let fields = extra_fields(fields);
        error!(
            tag = TAG_SYS,
            tracer = tracer.as_deref(),
            fields = fields.as_deref(),
            "{}",
            msg
        );
    }

    fn access(&self, ctx: &Context, data: &AccessLogData) {
        let tracer = tracer_field(ctx);
        let data = serde_json::to_string(data)
            .unwrap_or_else(|e| format!("{{\"error\":\"unserializable access log: {}\"}}", e));
        info!(
            tag = TAG_ACCESS_LOG,
            tracer = tracer.as_deref(),
            data = %data,
            "{}",
            TAG_ACCESS_LOG
        );
    }
}
