//! Structured file decoding onto a destination.

use std::path::Path;

use crate::coerce::CoerceError;
use crate::config::error::DecodeError;
use crate::mapper::{FieldError, FieldErrors, write_field};
use crate::schema::{Configurable, Field};
use crate::value::Value;

/// Decodes structured text straight into a destination, writing only the
/// fields the text mentions.
pub trait Decoder {
    fn decode_text<T: Configurable>(
        &self,
        text: &str,
        destination: &mut T,
    ) -> Result<(), DecodeError>;

    fn decode_file<T: Configurable>(
        &self,
        path: &Path,
        destination: &mut T,
    ) -> Result<(), DecodeError> {
        let text = std::fs::read_to_string(path).map_err(|source| DecodeError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        self.decode_text(&text, destination)
    }
}

/// TOML decoder.
///
/// Each top-level key is installed into the field with exactly that name,
/// or failing that, the field whose name matches ignoring case. Keys
/// without a field are ignored. Values go through the coercion engine, so
/// `port = "8080"` fills a `u16` just like `port = 8080`. Arrays and tables
/// only fit fields that can hold them, and no scalar field can.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlDecoder;

impl Decoder for TomlDecoder {
    fn decode_text<T: Configurable>(
        &self,
        text: &str,
        destination: &mut T,
    ) -> Result<(), DecodeError> {
        let table: toml::Table = toml::from_str(text)?;
        let fields = T::schema().fields();

        let mut errors = FieldErrors::default();
        for (key, value) in table {
            let Some(field) = find_field(fields, &key) else {
                tracing::debug!(key = %key, "no field for config key");
                continue;
            };
            let value = Value::from(value);
            let target = field.slot(destination).map(|slot| slot.kind());
            let result = match (&value, target) {
                (Value::Array(_) | Value::Table(_), Some(target)) if !target.is_unsupported() => {
                    Err(FieldError::Coerce {
                        field: field.name().to_string(),
                        source: CoerceError::Incompatible {
                            source_type: value.type_name(),
                            target,
                        },
                    })
                }
                _ => write_field(field, &value, destination),
            };
            if let Err(err) = result {
                errors.push(err);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::Fields(errors))
        }
    }
}

fn find_field<'a, T>(fields: &'a [Field<T>], key: &str) -> Option<&'a Field<T>> {
    fields
        .iter()
        .find(|f| f.name() == key)
        .or_else(|| fields.iter().find(|f| f.name().eq_ignore_ascii_case(key)))
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::coerce::AsSlot;
    use crate::schema::Schema;

    #[derive(Debug, Default, PartialEq)]
    struct Server {
        host: String,
        port: u16,
        debug: bool,
        started: DateTime<Utc>,
    }

    impl Configurable for Server {
        fn schema() -> &'static Schema<Self> {
            static SCHEMA: LazyLock<Schema<Server>> = LazyLock::new(|| {
                Schema::<Server>::structure()
                    .field("host", |s| s.host.as_slot())
                    .field("port", |s| s.port.as_slot())
                    .field("Debug", |s| s.debug.as_slot())
                    .field("started", |s| s.started.as_slot())
                    .read_only("version")
            });
            &SCHEMA
        }
    }

    #[test]
    fn decodes_only_mentioned_fields() {
        let mut server = Server {
            host: "localhost".to_string(),
            ..Server::default()
        };
        TomlDecoder.decode_text("port = 8080\n", &mut server).unwrap();
        assert_eq!(server.host, "localhost");
        assert_eq!(server.port, 8080);
    }

    #[test]
    fn values_are_coerced() {
        let mut server = Server::default();
        TomlDecoder
            .decode_text(
                "port = \"0x1F90\"\ndebug = \"yes\"\nstarted = 1976-01-03T13:32:54Z",
                &mut server,
            )
            .unwrap();
        assert_eq!(server.port, 8080);
        assert!(server.debug, "case-insensitive fallback should reach `Debug`");
        assert_eq!(server.started.to_rfc3339(), "1976-01-03T13:32:54+00:00");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut server = Server::default();
        TomlDecoder.decode_text("nope = 1\n[section]\nx = 2", &mut server).unwrap();
        assert_eq!(server, Server::default());
    }

    #[test]
    fn field_errors_are_collected() {
        let mut server = Server::default();
        let err = TomlDecoder
            .decode_text("port = 70000\nhost = \"h\"\nversion = \"2\"", &mut server)
            .unwrap_err();
        let DecodeError::Fields(errors) = err else {
            panic!("expected field errors, got {err:?}");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(server.host, "h");
    }

    #[test]
    fn composite_values_do_not_fill_scalar_fields() {
        let mut server = Server {
            host: "localhost".to_string(),
            ..Server::default()
        };
        let err = TomlDecoder
            .decode_text("host = [1]\nport = { a = 1 }\ndebug = true", &mut server)
            .unwrap_err();
        let DecodeError::Fields(errors) = err else {
            panic!("expected field errors, got {err:?}");
        };
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(
            e,
            FieldError::Coerce { source: CoerceError::Incompatible { .. }, .. }
        )));
        assert_eq!(
            errors.to_string().lines().next(),
            Some("can't set field 'host': can't convert array to 'String'")
        );
        assert_eq!(server.host, "localhost");
        assert_eq!(server.port, 0);
        assert!(server.debug);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let mut server = Server::default();
        let err = TomlDecoder.decode_text("not valid {{ toml", &mut server).unwrap_err();
        assert!(matches!(err, DecodeError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let mut server = Server::default();
        let err = TomlDecoder
            .decode_file(Path::new("/tmp/layerconf_not_exist_config.toml"), &mut server)
            .unwrap_err();
        assert!(err.to_string().contains("read"));
    }
}
