//! Fuzzy mapping of a string-keyed mapping onto a structure.
//!
//! Keys and field names are compared after dropping `-`, `_` and spaces
//! and folding case, so `int_val`, `Int-Val` and `intval` all bind to a
//! field named `IntVal`. A field's tag is tried as an alternate name.

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::coerce::{CoerceError, convert_slot};
use crate::schema::{Access, Configurable, DestinationError, Field};
use crate::text::fold_name;
use crate::value::Value;

/// Why a matched field was not written.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("can't set field '{field}': the field is unexported")]
    Unexported { field: String },

    #[error("can't set field '{field}'")]
    Inaccessible { field: String },

    #[error("can't set field '{field}': {source}")]
    Coerce {
        field: String,
        #[source]
        source: CoerceError,
    },
}

/// Every field-level failure of one pass, rendered one per line.
#[derive(Debug, Default)]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    pub(crate) fn push(&mut self, err: FieldError) {
        self.0.push(err);
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.0.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n");
        f.write_str(joined.trim_end())
    }
}

impl std::error::Error for FieldErrors {}

/// Result of [`map_to_struct`].
#[derive(Debug, Default)]
pub struct MapOutcome {
    /// Number of fields successfully written.
    pub matched: usize,
    pub errors: FieldErrors,
}

impl MapOutcome {
    /// `Ok(matched)` when no field failed, the collected errors otherwise.
    pub fn into_result(self) -> Result<usize, FieldErrors> {
        if self.errors.is_empty() {
            Ok(self.matched)
        } else {
            Err(self.errors)
        }
    }
}

/// Copy every entry of `source` whose key fuzzily matches a field of
/// `destination` into that field.
///
/// Fields are visited in schema order and keys in `source` order. The
/// first key matching a field binds it; later matching keys for the same
/// field are ignored. Fields without a matching key are left untouched and
/// are not an error.
///
/// Only a destination that is not a structure fails the whole call; every
/// field-level failure is collected into [`MapOutcome::errors`].
pub fn map_to_struct<T: Configurable>(
    source: &IndexMap<String, Value>,
    destination: &mut T,
) -> Result<MapOutcome, DestinationError> {
    let schema = T::schema();
    schema.require_struct()?;

    let keys: Vec<(String, &String, &Value)> = source
        .iter()
        .map(|(key, value)| (fold_name(key, "-_ "), key, value))
        .collect();

    let mut outcome = MapOutcome::default();
    for field in schema.fields() {
        let name = fold_name(field.name(), "-_");
        let tag = field.tag().map(|tag| fold_name(tag, "-_ "));
        let mut hits = keys
            .iter()
            .filter(|(folded, _, _)| *folded == name || tag.as_deref() == Some(folded.as_str()));

        let Some((_, key, value)) = hits.next() else {
            continue;
        };
        for (_, ignored, _) in hits {
            tracing::debug!(
                field = field.name(),
                bound = %key,
                ignored = %ignored,
                "ambiguous key ignored"
            );
        }

        let result = write_field(field, value, destination);
        match result {
            Ok(()) => outcome.matched += 1,
            Err(err) => {
                tracing::debug!(field = field.name(), error = %err, "field not mapped");
                outcome.errors.push(err);
            }
        }
    }
    Ok(outcome)
}

/// Coerce `value` into `field` of `destination`, refusing fields that are
/// not writable.
pub(crate) fn write_field<T>(
    field: &Field<T>,
    value: &Value,
    destination: &mut T,
) -> Result<(), FieldError> {
    let name = || field.name().to_string();
    match field.access() {
        Access::Writable(accessor) => {
            let slot = (*accessor)(destination);
            convert_slot(value, slot, None)
                .map_err(|source| FieldError::Coerce { field: name(), source })
        }
        Access::Unexported => Err(FieldError::Unexported { field: name() }),
        Access::ReadOnly => Err(FieldError::Inaccessible { field: name() }),
    }
}
