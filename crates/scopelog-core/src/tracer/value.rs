//! Field kinds and the scalar values a trace field set can carry.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value;

/// Kind of a record field.
///
/// Scalar kinds map one-to-one onto [`TraceValue`] variants, so every integer
/// and float width is its own kind. `Struct`, `Ptr`, `Slice` and `Map`
/// describe field types a trace field set refuses to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    String,
    U8,
    U16,
    U32,
    U64,
    Usize,
    I8,
    I16,
    I32,
    I64,
    Isize,
    F32,
    F64,
    Struct,
    Ptr,
    Slice,
    Map,
}

impl Kind {
    /// Whether values of this kind may be stored in a trace field set
    pub fn is_scalar(self) -> bool {
        !matches!(self, Kind::Struct | Kind::Ptr | Kind::Slice | Kind::Map)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::String => "string",
            Kind::U8 => "u8",
            Kind::U16 => "u16",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::Usize => "usize",
            Kind::I8 => "i8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::Isize => "isize",
            Kind::F32 => "f32",
            Kind::F64 => "f64",
            Kind::Struct => "struct",
            Kind::Ptr => "ptr",
            Kind::Slice => "slice",
            Kind::Map => "map",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scalar value stored in a trace field set
#[derive(Debug, Clone, PartialEq)]
pub enum TraceValue {
    Bool(bool),
    String(String),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    F32(f32),
    F64(f64),
}

impl TraceValue {
    pub fn kind(&self) -> Kind {
        match self {
            TraceValue::Bool(_) => Kind::Bool,
            TraceValue::String(_) => Kind::String,
            TraceValue::U8(_) => Kind::U8,
            TraceValue::U16(_) => Kind::U16,
            TraceValue::U32(_) => Kind::U32,
            TraceValue::U64(_) => Kind::U64,
            TraceValue::Usize(_) => Kind::Usize,
            TraceValue::I8(_) => Kind::I8,
            TraceValue::I16(_) => Kind::I16,
            TraceValue::I32(_) => Kind::I32,
            TraceValue::I64(_) => Kind::I64,
            TraceValue::Isize(_) => Kind::Isize,
            TraceValue::F32(_) => Kind::F32,
            TraceValue::F64(_) => Kind::F64,
        }
    }

    /// JSON rendering used when the set is attached to a log event.
    /// Non-finite floats render as `null`.
    pub fn to_json(&self) -> Value {
        match self {
            TraceValue::Bool(v) => Value::from(*v),
            TraceValue::String(v) => Value::from(v.as_str()),
            TraceValue::U8(v) => Value::from(*v),
            TraceValue::U16(v) => Value::from(*v),
            TraceValue::U32(v) => Value::from(*v),
            TraceValue::U64(v) => Value::from(*v),
            TraceValue::Usize(v) => Value::from(*v),
            TraceValue::I8(v) => Value::from(*v),
            TraceValue::I16(v) => Value::from(*v),
            TraceValue::I32(v) => Value::from(*v),
            TraceValue::I64(v) => Value::from(*v),
            TraceValue::Isize(v) => Value::from(*v),
            TraceValue::F32(v) => Value::from(*v),
            TraceValue::F64(v) => Value::from(*v),
        }
    }
}

/// A type that can appear as a field of a trace record.
///
/// Scalars convert to and from [`TraceValue`]. Container and record types
/// only report their kind so that building a trace field set from a record
/// holding them fails with a descriptive error.
pub trait TraceField {
    fn kind() -> Kind;

    fn to_trace_value(&self) -> Option<TraceValue>;

    fn from_trace_value(value: TraceValue) -> Option<Self>
    where
        Self: Sized;
}

macro_rules! scalar_field {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl TraceField for $ty {
                fn kind() -> Kind {
                    Kind::$variant
                }

                fn to_trace_value(&self) -> Option<TraceValue> {
                    Some(TraceValue::$variant(Clone::clone(self)))
                }

                fn from_trace_value(value: TraceValue) -> Option<Self> {
                    match value {
                        TraceValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

scalar_field! {
    bool => Bool,
    String => String,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    f32 => F32,
    f64 => F64,
}

macro_rules! opaque_field {
    ($kind:ident: $($ty:ty => [$($generic:ident),*]),* $(,)?) => {
        $(
            impl<$($generic),*> TraceField for $ty {
                fn kind() -> Kind {
                    Kind::$kind
                }

                fn to_trace_value(&self) -> Option<TraceValue> {
                    None
                }

                fn from_trace_value(_value: TraceValue) -> Option<Self> {
                    None
                }
            }
        )*
    };
}

opaque_field!(Ptr: Option<T> => [T], Box<T> => [T]);
opaque_field!(Slice: Vec<T> => [T]);
opaque_field!(Map: HashMap<K, V, S> => [K, V, S], BTreeMap<K, V> => [K, V]);
