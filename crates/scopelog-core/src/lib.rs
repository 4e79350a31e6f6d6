//! # Scopelog Core
//!
//! Context-scoped structured logging.
//!
//! ## Modules
//!
//! - `tracer` - Trace field sets captured from plain records
//! - `context` - Request-scoped carrier for a trace field set
//! - `logger` - Structured logger capability and its implementations
//! - `access` - Access log data model
//! - `subscriber` - `tracing` subscriber setup
//!
//! ## Usage
//!
//! ```
//! use scopelog_core::{inject, kv, trace_record, Context, Logger, MemoryLogger, Tracer};
//!
//! trace_record! {
//!     #[derive(Debug, Default)]
//!     pub struct RequestIds {
//!         #[trace(tracer = "trace_id")]
//!         pub request_id: String,
//!     }
//! }
//!
//! let tracer = Tracer::new(&RequestIds { request_id: "r-1".into() }).unwrap();
//! let ctx = inject(&Context::background(), tracer);
//!
//! let logger = MemoryLogger::new();
//! logger.info(&ctx, "order accepted", &[kv("order", 42)]);
//!
//! let entry = &logger.entries()[0];
//! assert_eq!(entry.tracer.as_ref().unwrap()["trace_id"], "r-1");
//! ```

pub mod access;
pub mod context;
pub mod error;
pub mod logger;
pub mod subscriber;
pub mod tracer;

pub use access::{AccessLogData, HttpData};
pub use context::{extract, inject, must_extract, Context};
pub use error::TracerError;
pub use logger::{
    kv, KeyValue, LogEntry, Logger, MemoryLogger, TracingLogger, TAG_ACCESS_LOG, TAG_SYS,
};
pub use subscriber::{init_tracing, InitError, LogConfig, LogFormat};
pub use tracer::{
    unmarshal_tracer, FieldSchema, Kind, RecordSchema, RecordSchemaBuilder, TraceEntry,
    TraceField, TraceRecord, TraceValue, Tracer, TracerConfig, DEFAULT_TAG,
};
