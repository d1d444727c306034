//! Field-descriptor tables for destination types.
//!
//! Rust has no runtime reflection, so every destination type describes
//! itself once through a [`Schema`]: an ordered list of named fields, each
//! with an optional tag and an accessor that borrows the field as a
//! [`Slot`]. The mapper and the loader only ever see this table, which
//! keeps the destination's shape unknown to the engine itself.
//!
//! ```
//! use std::sync::LazyLock;
//! use layerconf::coerce::AsSlot;
//! use layerconf::schema::{Configurable, Schema};
//!
//! #[derive(Default)]
//! struct Settings {
//!     port: u16,
//!     verbose: bool,
//! }
//!
//! impl Configurable for Settings {
//!     fn schema() -> &'static Schema<Self> {
//!         static SCHEMA: LazyLock<Schema<Settings>> = LazyLock::new(|| {
//!             Schema::<Settings>::structure()
//!                 .field("port", |s| s.port.as_slot())
//!                 .tag("listen port")
//!                 .field("verbose", |s| s.verbose.as_slot())
//!         });
//!         &SCHEMA
//!     }
//! }
//! ```

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use crate::coerce::{AsSlot, Slot};

/// Borrow one field of `T` as a slot.
pub type Accessor<T> = for<'a> fn(&'a mut T) -> Slot<'a>;

/// How a field may be reached.
pub enum Access<T> {
    Writable(Accessor<T>),
    /// Declared but private to its type; matches are reported, never written.
    Unexported,
    /// Public but not settable from configuration.
    ReadOnly,
}

/// One entry of a [`Schema`].
pub struct Field<T> {
    name: &'static str,
    tag: Option<&'static str>,
    access: Access<T>,
}

impl<T> Field<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Alternate name used by fuzzy matching; doubles as the help text of
    /// the field's command-line flag.
    pub fn tag(&self) -> Option<&'static str> {
        self.tag
    }

    pub fn access(&self) -> &Access<T> {
        &self.access
    }

    /// Borrow the field in `target`, or `None` if it is not writable.
    pub fn slot<'a>(&self, target: &'a mut T) -> Option<Slot<'a>> {
        match self.access {
            Access::Writable(accessor) => Some(accessor(target)),
            Access::Unexported | Access::ReadOnly => None,
        }
    }
}

/// Whether a destination is a structure or a lone scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Shape {
    Struct,
    Scalar,
}

/// Ordered field table of a destination type.
pub struct Schema<T> {
    type_name: &'static str,
    shape: Shape,
    fields: Vec<Field<T>>,
}

impl<T> Schema<T> {
    /// An empty structure schema; add fields with [`Schema::field`].
    pub fn structure() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            shape: Shape::Struct,
            fields: Vec::new(),
        }
    }

    /// Schema of a destination that is itself a single scalar.
    pub fn scalar(accessor: Accessor<T>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            shape: Shape::Scalar,
            fields: vec![Field {
                name: "",
                tag: None,
                access: Access::Writable(accessor),
            }],
        }
    }

    /// Add a writable field.
    pub fn field(self, name: &'static str, accessor: Accessor<T>) -> Self {
        self.push(name, Access::Writable(accessor))
    }

    /// Add a field that exists on the type but is private to it.
    pub fn unexported(self, name: &'static str) -> Self {
        self.push(name, Access::Unexported)
    }

    /// Add a field that may be matched but never written.
    pub fn read_only(self, name: &'static str) -> Self {
        self.push(name, Access::ReadOnly)
    }

    /// Set the tag of the most recently added field.
    pub fn tag(mut self, tag: &'static str) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.tag = Some(tag);
        }
        self
    }

    fn push(mut self, name: &'static str, access: Access<T>) -> Self {
        self.fields.push(Field {
            name,
            tag: None,
            access,
        });
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    /// Fails unless this schema describes a structure.
    pub fn require_struct(&self) -> Result<(), DestinationError> {
        match self.shape {
            Shape::Struct => Ok(()),
            Shape::Scalar => Err(DestinationError::NotAStruct {
                type_name: self.type_name,
                shape: self.shape,
            }),
        }
    }
}

/// The destination cannot receive field-wise configuration.
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("destination '{type_name}' is not a structure (it is a {shape})")]
    NotAStruct { type_name: &'static str, shape: Shape },
}

/// A type that describes its own fields.
pub trait Configurable: Sized + 'static {
    fn schema() -> &'static Schema<Self>;
}

macro_rules! scalar_configurable {
    ($($t:ty),* $(,)?) => {
        $(impl Configurable for $t {
            fn schema() -> &'static Schema<Self> {
                static SCHEMA: LazyLock<Schema<$t>> =
                    LazyLock::new(|| Schema::<$t>::scalar(|v| v.as_slot()));
                &SCHEMA
            }
        })*
    };
}

scalar_configurable!(
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    String,
    DateTime<Utc>,
    DateTime<FixedOffset>,
);
