//! Error types for building and restoring trace field sets

use thiserror::Error;

use crate::tracer::Kind;

/// Error returned when a trace field set cannot be built from a record or
/// restored into one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TracerError {
    /// The record holds a field that is not a scalar (struct, pointer,
    /// collection). Nothing is captured when this happens.
    #[error("tracer record only supports scalar field types, not type {kind} on field {field}")]
    UnsupportedType { field: &'static str, kind: Kind },

    /// Two fields resolve to the same log key after annotation lookup
    #[error("duplicate log key '{key}'")]
    DuplicateKey { key: String },

    /// The stored value's kind differs from the target field's kind
    #[error("target field {field} with type {expected} does not match source type {found}")]
    TypeMismatch {
        field: &'static str,
        expected: Kind,
        found: Kind,
    },

    /// The target field exists but has no setter
    #[error("target field {field} with type {kind} cannot be set")]
    ReadOnlyField { field: &'static str, kind: Kind },
}
