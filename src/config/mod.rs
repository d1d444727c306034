//! Configuration loading and layering.
//!
//! A [`Loader`] fills any [`Configurable`](crate::schema::Configurable)
//! value from a home config file, an explicit config file and command-line
//! flags, in that order.

pub mod decoder;
pub mod error;
pub mod flags;
pub mod loader;
pub mod report;

pub use decoder::{Decoder, TomlDecoder};
pub use error::{DecodeError, Layer, LayerError, LayerErrors, LoadError};
pub use flags::{Flag, FlagSet};
pub use loader::{Loader, default_app_name};
pub use report::{ConsoleReporter, Level, MemoryReporter, Reporter};
