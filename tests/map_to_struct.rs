//! Fuzzy mapping of loosely typed mappings onto structures.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use layerconf::{AsSlot, Configurable, DestinationError, FieldError, Schema, Value, map_to_struct};
use pretty_assertions::assert_eq;

fn mapping(entries: &[(&str, Value)]) -> IndexMap<String, Value> {
    entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

// ---------------------------------------------------------------------------
// Destinations
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq)]
struct Measures {
    int_val: i32,
    float_val: f64,
}

impl Configurable for Measures {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<Measures>> = LazyLock::new(|| {
            Schema::<Measures>::structure()
                .field("IntVal", |m| m.int_val.as_slot())
                .field("FloatVal", |m| m.float_val.as_slot())
        });
        &SCHEMA
    }
}

/// `IntVal` is private to its module and cannot be written.
#[derive(Debug, Default, PartialEq)]
struct Sealed {
    float_val: f64,
}

impl Configurable for Sealed {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<Sealed>> = LazyLock::new(|| {
            Schema::<Sealed>::structure()
                .unexported("intVal")
                .field("FloatVal", |s| s.float_val.as_slot())
        });
        &SCHEMA
    }
}

#[derive(Debug, Default, PartialEq)]
struct Tagged {
    value1: i64,
    float_val: i64,
}

impl Configurable for Tagged {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<Tagged>> = LazyLock::new(|| {
            Schema::<Tagged>::structure()
                .field("Value1", |t| t.value1.as_slot())
                .tag("intVal")
                .field("FloatVal", |t| t.float_val.as_slot())
        });
        &SCHEMA
    }
}

#[derive(Debug, Default, PartialEq)]
struct Event {
    title: String,
    at: DateTime<Utc>,
    attendees: u16,
    public: bool,
}

impl Configurable for Event {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: LazyLock<Schema<Event>> = LazyLock::new(|| {
            Schema::<Event>::structure()
                .field("Title", |e| e.title.as_slot())
                .field("At", |e| e.at.as_slot())
                .field("Attendees", |e| e.attendees.as_slot())
                .field("Public", |e| e.public.as_slot())
        });
        &SCHEMA
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn non_struct_destinations_are_rejected() {
    let err = map_to_struct(&IndexMap::new(), &mut 0u8).unwrap_err();
    assert!(matches!(err, DestinationError::NotAStruct { .. }));
    assert!(err.to_string().contains("u8"), "{err}");
}

#[test]
fn snake_case_keys_fill_camel_case_fields() {
    let src = mapping(&[("int_val", 1976.into()), ("float_val", 19.76.into())]);
    let mut dst = Measures::default();
    let outcome = map_to_struct(&src, &mut dst).unwrap();
    assert_eq!(outcome.into_result().unwrap(), 2);
    assert_eq!(dst, Measures { int_val: 1976, float_val: 19.76 });
}

#[test]
fn unexported_fields_are_skipped_with_an_error() {
    let src = mapping(&[("int_val", 1976.into()), ("float_val", 19.76.into())]);
    let mut dst = Sealed::default();
    let outcome = map_to_struct(&src, &mut dst).unwrap();
    assert_eq!(outcome.matched, 1);
    assert_eq!(dst.float_val, 19.76);
    assert!(matches!(outcome.errors.iter().next(), Some(FieldError::Unexported { .. })));
}

#[test]
fn tags_act_as_alternate_names() {
    let src = mapping(&[("int_val", 1976.into()), ("float_val", 19.76.into())]);
    let mut dst = Tagged::default();
    let outcome = map_to_struct(&src, &mut dst).unwrap();
    assert_eq!(outcome.matched, 1);
    assert_eq!(dst, Tagged { value1: 1976, float_val: 0 });
    let errors = outcome.into_result().unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors.to_string().starts_with("can't set field 'FloatVal'"));
}

#[test]
fn json_documents_map_after_coercion() {
    let src: IndexMap<String, Value> = serde_json::from_str(
        r#"{"title": "launch", "at": "1976-01-03 13:32:54", "attendees": "0x40", "public": "yes"}"#,
    )
    .unwrap();
    let mut dst = Event::default();
    let outcome = map_to_struct(&src, &mut dst).unwrap();
    assert_eq!(outcome.into_result().unwrap(), 4);
    assert_eq!(dst.title, "launch");
    assert_eq!(dst.at.to_rfc3339(), "1976-01-03T13:32:54+00:00");
    assert_eq!(dst.attendees, 64);
    assert!(dst.public);
}

#[test]
fn json_null_clears_a_string_field() {
    let src: IndexMap<String, Value> =
        serde_json::from_str(r#"{"title": null, "attendees": 3}"#).unwrap();
    let mut dst = Event {
        title: "draft".to_string(),
        ..Event::default()
    };
    let outcome = map_to_struct(&src, &mut dst).unwrap();
    assert_eq!(outcome.into_result().unwrap(), 2);
    assert_eq!(dst.title, "");
    assert_eq!(dst.attendees, 3);
}

#[test]
fn failures_leave_fields_untouched_and_keep_going() {
    let src = mapping(&[
        ("attendees", 70000.into()),
        ("title", "kept".into()),
        ("public", "maybe".into()),
    ]);
    let mut dst = Event {
        attendees: 5,
        ..Event::default()
    };
    let outcome = map_to_struct(&src, &mut dst).unwrap();
    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.errors.len(), 2);
    assert_eq!(dst.attendees, 5);
    assert_eq!(dst.title, "kept");
}
