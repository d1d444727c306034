//! Dynamic coercion of loosely-typed values into typed destinations.
//!
//! A destination is reached through a [`Slot`]: a mutable reference to one
//! of the supported scalar types. [`convert`] renders the source
//! [`Value`] to its literal form and parses that form according to the
//! slot's kind, so `"0x1976"`, `6518` and `"1976h"` all land in an `i32` as
//! the same number.

mod time;

use std::fmt;
use std::num::ParseIntError;

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use crate::text::split_radix;
use crate::value::Value;

/// Literals accepted as `false`; the entry at the same index in [`TRUTHY`]
/// is its `true` counterpart.
const FALSY: [&str; 5] = ["false", "off", "no", "0", "-"];
const TRUTHY: [&str; 5] = ["true", "on", "yes", "1", "+"];

/// Errors raised while coercing a single value.
#[derive(Debug, Error)]
pub enum CoerceError {
    #[error("target type '{0}' is not supported")]
    UnsupportedType(&'static str),

    #[error("can't convert {source_type} to '{target}': parsing \"{literal}\": invalid syntax")]
    Syntax {
        source_type: &'static str,
        target: Kind,
        literal: String,
    },

    #[error("can't convert {source_type} to '{target}': parsing \"{literal}\": {source}")]
    Range {
        source_type: &'static str,
        target: Kind,
        literal: String,
        source: ParseIntError,
    },

    #[error(
        "can't convert {source_type} to '{target}': parsing \"{literal}\": unknown time format"
    )]
    UnknownTimeFormat {
        source_type: &'static str,
        target: Kind,
        literal: String,
    },

    /// A composite value aimed at a scalar destination.
    #[error("can't convert {source_type} to '{target}'")]
    Incompatible {
        source_type: &'static str,
        target: Kind,
    },
}

/// The scalar kinds a [`Slot`] can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIs)]
pub enum Kind {
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "i8")]
    I8,
    #[strum(serialize = "i16")]
    I16,
    #[strum(serialize = "i32")]
    I32,
    #[strum(serialize = "i64")]
    I64,
    #[strum(serialize = "isize")]
    Isize,
    #[strum(serialize = "u8")]
    U8,
    #[strum(serialize = "u16")]
    U16,
    #[strum(serialize = "u32")]
    U32,
    #[strum(serialize = "u64")]
    U64,
    #[strum(serialize = "usize")]
    Usize,
    #[strum(serialize = "f32")]
    F32,
    #[strum(serialize = "f64")]
    F64,
    #[strum(serialize = "String")]
    Str,
    #[strum(serialize = "DateTime<Utc>")]
    Utc,
    #[strum(serialize = "DateTime<FixedOffset>")]
    Fixed,
    #[strum(serialize = "unsupported")]
    Unsupported,
}

/// A mutable reference to one destination scalar.
#[derive(Debug)]
pub enum Slot<'a> {
    Bool(&'a mut bool),
    I8(&'a mut i8),
    I16(&'a mut i16),
    I32(&'a mut i32),
    I64(&'a mut i64),
    Isize(&'a mut isize),
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    U64(&'a mut u64),
    Usize(&'a mut usize),
    F32(&'a mut f32),
    F64(&'a mut f64),
    Str(&'a mut String),
    Utc(&'a mut DateTime<Utc>),
    Fixed(&'a mut DateTime<FixedOffset>),
    /// A destination of a type the engine cannot write, by type name.
    Unsupported(&'static str),
}

impl Slot<'_> {
    pub fn kind(&self) -> Kind {
        match self {
            Slot::Bool(_) => Kind::Bool,
            Slot::I8(_) => Kind::I8,
            Slot::I16(_) => Kind::I16,
            Slot::I32(_) => Kind::I32,
            Slot::I64(_) => Kind::I64,
            Slot::Isize(_) => Kind::Isize,
            Slot::U8(_) => Kind::U8,
            Slot::U16(_) => Kind::U16,
            Slot::U32(_) => Kind::U32,
            Slot::U64(_) => Kind::U64,
            Slot::Usize(_) => Kind::Usize,
            Slot::F32(_) => Kind::F32,
            Slot::F64(_) => Kind::F64,
            Slot::Str(_) => Kind::Str,
            Slot::Utc(_) => Kind::Utc,
            Slot::Fixed(_) => Kind::Fixed,
            Slot::Unsupported(_) => Kind::Unsupported,
        }
    }

    /// Current value in literal form, as it would be accepted back by
    /// [`convert_slot`]. Unsupported slots render as an empty string.
    pub fn render(&self) -> String {
        match self {
            Slot::Bool(v) => v.to_string(),
            Slot::I8(v) => v.to_string(),
            Slot::I16(v) => v.to_string(),
            Slot::I32(v) => v.to_string(),
            Slot::I64(v) => v.to_string(),
            Slot::Isize(v) => v.to_string(),
            Slot::U8(v) => v.to_string(),
            Slot::U16(v) => v.to_string(),
            Slot::U32(v) => v.to_string(),
            Slot::U64(v) => v.to_string(),
            Slot::Usize(v) => v.to_string(),
            Slot::F32(v) => v.to_string(),
            Slot::F64(v) => v.to_string(),
            Slot::Str(v) => (**v).clone(),
            Slot::Utc(v) => v.to_rfc3339(),
            Slot::Fixed(v) => v.to_rfc3339(),
            Slot::Unsupported(_) => String::new(),
        }
    }
}

impl fmt::Display for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Types that can be borrowed as a [`Slot`].
pub trait AsSlot {
    fn as_slot(&mut self) -> Slot<'_>;
}

macro_rules! as_slot {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl AsSlot for $t {
            fn as_slot(&mut self) -> Slot<'_> {
                Slot::$variant(self)
            }
        })*
    };
}

as_slot! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    String => Str,
    DateTime<Utc> => Utc,
    DateTime<FixedOffset> => Fixed,
}

// Containers are valid struct members but never coercion targets.
impl<T> AsSlot for Vec<T> {
    fn as_slot(&mut self) -> Slot<'_> {
        Slot::Unsupported(std::any::type_name::<Self>())
    }
}

impl<T> AsSlot for Option<T> {
    fn as_slot(&mut self) -> Slot<'_> {
        Slot::Unsupported(std::any::type_name::<Self>())
    }
}

impl<K, V, S> AsSlot for std::collections::HashMap<K, V, S> {
    fn as_slot(&mut self) -> Slot<'_> {
        Slot::Unsupported(std::any::type_name::<Self>())
    }
}

/// Convert `source` into `destination`.
///
/// `layout` is an extra chrono `strftime` format tried last when the
/// destination is a timestamp; it is ignored for every other kind.
///
/// ```
/// use layerconf::coerce::convert;
///
/// let mut port = 0u16;
/// convert("0x1F90", &mut port, None).unwrap();
/// assert_eq!(port, 8080);
/// ```
pub fn convert<T>(
    source: impl Into<Value>,
    destination: &mut T,
    layout: Option<&str>,
) -> Result<(), CoerceError>
where
    T: AsSlot + ?Sized,
{
    convert_slot(&source.into(), destination.as_slot(), layout)
}

/// Convert `source` into an already borrowed slot.
pub fn convert_slot(
    source: &Value,
    slot: Slot<'_>,
    layout: Option<&str>,
) -> Result<(), CoerceError> {
    let literal = source.to_string();
    let trimmed = literal.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'');
    let target = slot.kind();
    let source_type = source.type_name();
    let syntax = || CoerceError::Syntax {
        source_type,
        target,
        literal: literal.clone(),
    };
    let range = |source: ParseIntError| CoerceError::Range {
        source_type,
        target,
        literal: literal.clone(),
        source,
    };

    macro_rules! int {
        ($dst:expr, $t:ty) => {{
            let (digits, base) = split_radix(trimmed);
            *$dst = <$t>::from_str_radix(&digits, base).map_err(range)?;
        }};
    }

    // Out-of-range literals parse to infinity; only an explicit spelling
    // may produce a non-finite value.
    macro_rules! float {
        ($dst:expr, $t:ty) => {{
            let parsed: $t = trimmed.parse().map_err(|_| syntax())?;
            if !parsed.is_finite() && !is_non_finite_spelling(trimmed) {
                return Err(syntax());
            }
            *$dst = parsed;
        }};
    }

    match slot {
        Slot::Bool(dst) => *dst = parse_bool(trimmed).ok_or_else(syntax)?,
        Slot::I8(dst) => int!(dst, i8),
        Slot::I16(dst) => int!(dst, i16),
        Slot::I32(dst) => int!(dst, i32),
        Slot::I64(dst) => int!(dst, i64),
        Slot::Isize(dst) => int!(dst, isize),
        Slot::U8(dst) => int!(dst, u8),
        Slot::U16(dst) => int!(dst, u16),
        Slot::U32(dst) => int!(dst, u32),
        Slot::U64(dst) => int!(dst, u64),
        Slot::Usize(dst) => int!(dst, usize),
        Slot::F32(dst) => float!(dst, f32),
        Slot::F64(dst) => float!(dst, f64),
        Slot::Str(dst) => *dst = literal.clone(),
        Slot::Utc(dst) => {
            *dst = timestamp(source, &literal, trimmed, layout, target)?.with_timezone(&Utc);
        }
        Slot::Fixed(dst) => *dst = timestamp(source, &literal, trimmed, layout, target)?,
        Slot::Unsupported(type_name) => return Err(CoerceError::UnsupportedType(type_name)),
    }
    Ok(())
}

fn is_non_finite_spelling(trimmed: &str) -> bool {
    let unsigned = trimmed.trim_start_matches(['+', '-']).to_ascii_lowercase();
    matches!(unsigned.as_str(), "inf" | "infinity" | "nan")
}

fn parse_bool(trimmed: &str) -> Option<bool> {
    let lower = trimmed.to_lowercase();
    if FALSY.contains(&lower.as_str()) {
        Some(false)
    } else if TRUTHY.contains(&lower.as_str()) {
        Some(true)
    } else {
        None
    }
}

fn timestamp(
    source: &Value,
    literal: &str,
    trimmed: &str,
    layout: Option<&str>,
    target: Kind,
) -> Result<DateTime<FixedOffset>, CoerceError> {
    if let Value::Time(t) = source {
        return Ok(*t);
    }
    time::parse_timestamp(literal, trimmed, layout).ok_or_else(|| CoerceError::UnknownTimeFormat {
        source_type: source.type_name(),
        target,
        literal: literal.to_string(),
    })
}
