//! Trace field sets
//!
//! A [`Tracer`] is an immutable, ordered bag of scalar values captured from a
//! plain record. Each value remembers the record field it came from and the
//! log key it is emitted under. It is built once per unit of work (usually
//! one inbound request), carried in a [`Context`](crate::Context) and read
//! back by every log call made with that context.

mod schema;
mod value;

pub use schema::{FieldSchema, RecordSchema, RecordSchemaBuilder, TraceRecord};
pub use value::{Kind, TraceField, TraceValue};

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::TracerError;

/// Default annotation tag, also the field name the set is logged under
pub const DEFAULT_TAG: &str = "tracer";

/// Options for building a [`Tracer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerConfig {
    /// Annotation tag consulted for log keys
    pub tag: String,
}

impl TracerConfig {
    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self::with_tag(DEFAULT_TAG)
    }
}

/// One captured field
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    /// Name of the record field the value was read from
    pub field: &'static str,
    /// Key the value is emitted under
    pub log_key: &'static str,
    pub value: TraceValue,
}

/// Immutable set of trace fields
#[derive(Debug, Clone, PartialEq)]
pub struct Tracer {
    tag: String,
    entries: Vec<TraceEntry>,
}

impl Tracer {
    /// Capture `record` using the default tag
    pub fn new<T: TraceRecord>(record: &T) -> Result<Self, TracerError> {
        Self::with_config(record, &TracerConfig::default())
    }

    /// Capture every field of `record`, in declaration order.
    ///
    /// Fails without producing a partial set when a field is not a scalar or
    /// when two fields resolve to the same log key.
    pub fn with_config<T: TraceRecord>(record: &T, config: &TracerConfig) -> Result<Self, TracerError> {
        let tag = config.tag.trim();
        let fields = T::schema().fields();

        let mut seen = HashSet::with_capacity(fields.len());
        let mut entries = Vec::with_capacity(fields.len());

        for field in fields {
            let unsupported = TracerError::UnsupportedType {
                field: field.name(),
                kind: field.kind(),
            };
            if !field.kind().is_scalar() {
                return Err(unsupported);
            }
            let value = field.value(record).ok_or(unsupported)?;

            let log_key = field.log_key(tag);
            if !seen.insert(log_key) {
                return Err(TracerError::DuplicateKey {
                    key: log_key.to_string(),
                });
            }

            entries.push(TraceEntry {
                field: field.name(),
                log_key,
                value,
            });
        }

        Ok(Self {
            tag: tag.to_string(),
            entries,
        })
    }

    /// A set with no entries, used where a context carries none
    pub fn empty() -> Self {
        Self {
            tag: DEFAULT_TAG.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    /// Look up an entry by source field name
    pub fn get(&self, field: &str) -> Option<&TraceEntry> {
        self.entries.iter().find(|e| e.field == field)
    }

    /// `{log key: value}` object attached to log events
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|e| (e.log_key.to_string(), e.value.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Copy the captured values into `target`, matching by field name.
    ///
    /// Target fields absent from the set are left untouched. Kinds must
    /// match exactly; nothing is coerced between widths or between numbers
    /// and strings. On failure, fields processed before the failing one
    /// keep their new values.
    pub fn unmarshal<T: TraceRecord>(&self, target: &mut T) -> Result<(), TracerError> {
        for field in T::schema().fields() {
            let Some(entry) = self.get(field.name()) else {
                continue;
            };

            if !field.is_writable() {
                return Err(TracerError::ReadOnlyField {
                    field: field.name(),
                    kind: field.kind(),
                });
            }

            let mismatch = TracerError::TypeMismatch {
                field: field.name(),
                expected: field.kind(),
                found: entry.value.kind(),
            };
            if entry.value.kind() != field.kind() {
                return Err(mismatch);
            }

            field
                .assign(target, entry.value.clone())
                .map_err(|_| mismatch)?;
        }

        Ok(())
    }
}

/// Restore `tracer` into `target`. See [`Tracer::unmarshal`].
pub fn unmarshal_tracer<T: TraceRecord>(tracer: &Tracer, target: &mut T) -> Result<(), TracerError> {
    tracer.unmarshal(target)
}
