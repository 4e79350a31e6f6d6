//! Record schemas
//!
//! A schema is the explicit, ordered description of a record type's fields:
//! name, kind, per-tag annotations, an accessor and (optionally) a setter.
//! It is built once per type and reused by every trace field set built from
//! or restored into that type.

use super::value::{Kind, TraceField, TraceValue};

type Getter<T> = Box<dyn Fn(&T) -> Option<TraceValue> + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, TraceValue) -> Result<(), TraceValue> + Send + Sync>;

/// A record type whose fields can be captured into a [`Tracer`](super::Tracer).
///
/// Usually implemented through [`trace_record!`](crate::trace_record).
pub trait TraceRecord: Sized + 'static {
    fn schema() -> &'static RecordSchema<Self>;
}

/// Description of one field of a record type
pub struct FieldSchema<T> {
    name: &'static str,
    kind: Kind,
    annotations: Vec<(&'static str, &'static str)>,
    get: Getter<T>,
    set: Option<Setter<T>>,
}

impl<T> FieldSchema<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Raw annotation registered for `tag`, if any
    pub fn annotation(&self, tag: &str) -> Option<&'static str> {
        self.annotations
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, annotation)| *annotation)
    }

    /// Key this field is logged under for `tag`: the first comma-delimited
    /// segment of its annotation, or the field name when there is none.
    pub fn log_key(&self, tag: &str) -> &'static str {
        match self.annotation(tag.trim()) {
            Some(annotation) => annotation.split(',').next().unwrap_or(annotation),
            None => self.name,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }

    pub(crate) fn value(&self, record: &T) -> Option<TraceValue> {
        (self.get)(record)
    }

    /// Writes `value` into the field. Hands the value back when the field
    /// is read-only or cannot hold it.
    pub(crate) fn assign(&self, record: &mut T, value: TraceValue) -> Result<(), TraceValue> {
        match &self.set {
            Some(set) => set(record, value),
            None => Err(value),
        }
    }
}

impl<T> std::fmt::Debug for FieldSchema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSchema")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("annotations", &self.annotations)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Ordered field list of a record type
pub struct RecordSchema<T> {
    fields: Vec<FieldSchema<T>>,
}

impl<T: 'static> RecordSchema<T> {
    pub fn builder() -> RecordSchemaBuilder<T> {
        RecordSchemaBuilder { fields: Vec::new() }
    }
}

impl<T> RecordSchema<T> {
    pub fn fields(&self) -> &[FieldSchema<T>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema<T>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl<T> std::fmt::Debug for RecordSchema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.fields).finish()
    }
}

/// Builder for [`RecordSchema`]
///
/// ```
/// use scopelog_core::RecordSchema;
///
/// struct Session {
///     user: String,
///     attempt: u32,
/// }
///
/// let schema = RecordSchema::builder()
///     .field("user", |s: &Session| &s.user, |s: &mut Session| &mut s.user)
///     .tag("tracer", "user_id,omitempty")
///     .read_only("attempt", |s: &Session| &s.attempt)
///     .build();
///
/// assert_eq!(schema.fields()[0].log_key("tracer"), "user_id");
/// assert_eq!(schema.fields()[1].log_key("tracer"), "attempt");
/// ```
pub struct RecordSchemaBuilder<T> {
    fields: Vec<FieldSchema<T>>,
}

impl<T: 'static> RecordSchemaBuilder<T> {
    /// Add a readable and writable field
    pub fn field<F>(mut self, name: &'static str, get: fn(&T) -> &F, set: fn(&mut T) -> &mut F) -> Self
    where
        F: TraceField + 'static,
    {
        self.fields.push(FieldSchema {
            name,
            kind: F::kind(),
            annotations: Vec::new(),
            get: Box::new(move |record: &T| get(record).to_trace_value()),
            set: Some(Box::new(move |record: &mut T, value: TraceValue| {
                let converted = F::from_trace_value(value.clone()).ok_or(value)?;
                *set(record) = converted;
                Ok(())
            })),
        });
        self
    }

    /// Add a field that can be captured but never restored
    pub fn read_only<F>(mut self, name: &'static str, get: fn(&T) -> &F) -> Self
    where
        F: TraceField + 'static,
    {
        self.fields.push(FieldSchema {
            name,
            kind: F::kind(),
            annotations: Vec::new(),
            get: Box::new(move |record: &T| get(record).to_trace_value()),
            set: None,
        });
        self
    }

    /// Attach an annotation for `tag` to the most recently added field
    pub fn tag(mut self, tag: &'static str, annotation: &'static str) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.annotations.retain(|(t, _)| *t != tag);
            field.annotations.push((tag, annotation));
        }
        self
    }

    pub fn build(self) -> RecordSchema<T> {
        RecordSchema {
            fields: self.fields,
        }
    }
}

/// Declare a plain struct together with its [`TraceRecord`] schema.
///
/// Every field type must implement [`TraceField`]. Annotations are given per
/// tag with `#[trace(tag = "annotation")]`; the first comma-delimited segment
/// of the annotation becomes the log key for that tag. Other field attributes,
/// doc comments included, are kept on the generated struct.
///
/// ```
/// use scopelog_core::{trace_record, Tracer};
///
/// trace_record! {
///     #[derive(Debug, Default)]
///     pub struct Propagation {
///         /// Caller supplied id
///         #[trace(tracer = "trace_id")]
///         pub request_id: String,
///         pub retries: u8,
///     }
/// }
///
/// let tracer = Tracer::new(&Propagation { request_id: "r-1".into(), retries: 2 }).unwrap();
/// assert_eq!(tracer.get("request_id").unwrap().log_key, "trace_id");
/// ```
#[macro_export]
macro_rules! trace_record {
    // Struct definition with `#[trace(..)]` removed from each field
    (@struct [$($head:tt)*] [$($done:tt)*]) => {
        $($head)* { $($done)* }
    };
    (@struct $head:tt [$($done:tt)*] { [$($field:tt)*] [$($kept:tt)*] } $($rest:tt)*) => {
        $crate::trace_record!(@struct $head [$($done)* $($kept)* $($field)*,] $($rest)*);
    };
    (@struct $head:tt $done:tt { $field:tt $kept:tt #[trace $args:tt] $($attrs:tt)* } $($rest:tt)*) => {
        $crate::trace_record!(@struct $head $done { $field $kept $($attrs)* } $($rest)*);
    };
    (@struct $head:tt $done:tt { $field:tt [$($kept:tt)*] #[$($attr:tt)*] $($attrs:tt)* } $($rest:tt)*) => {
        $crate::trace_record!(@struct $head $done { $field [$($kept)* #[$($attr)*]] $($attrs)* } $($rest)*);
    };

    // `.tag(..)` calls for the `#[trace(..)]` attributes of one field
    (@tags $builder:expr;) => {
        $builder
    };
    (@tags $builder:expr; #[trace($($tag:ident = $annotation:literal),* $(,)?)] $($rest:tt)*) => {
        $crate::trace_record!(@tags $builder $(.tag(stringify!($tag), $annotation))*; $($rest)*)
    };
    (@tags $builder:expr; #[$($attr:tt)*] $($rest:tt)*) => {
        $crate::trace_record!(@tags $builder; $($rest)*)
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$($fattr:tt)*])*
                $fvis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $crate::trace_record!(@struct
            [$(#[$meta])* $vis struct $name]
            []
            $({ [$fvis $field: $ty] [] $(#[$($fattr)*])* })*
        );

        impl $crate::TraceRecord for $name {
            fn schema() -> &'static $crate::RecordSchema<Self> {
                static SCHEMA: ::std::sync::OnceLock<$crate::RecordSchema<$name>> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    let builder = $crate::RecordSchema::<$name>::builder();
                    $(
                        let builder = builder.field(
                            stringify!($field),
                            |record: &$name| &record.$field,
                            |record: &mut $name| &mut record.$field,
                        );
                        let builder = $crate::trace_record!(@tags builder; $(#[$($fattr)*])*);
                    )*
                    builder.build()
                })
            }
        }

        impl $crate::TraceField for $name {
            fn kind() -> $crate::Kind {
                $crate::Kind::Struct
            }

            fn to_trace_value(&self) -> ::std::option::Option<$crate::TraceValue> {
                ::std::option::Option::None
            }

            fn from_trace_value(_value: $crate::TraceValue) -> ::std::option::Option<Self> {
                ::std::option::Option::None
            }
        }
    };
}
