//! layerconf: layered configuration loading for command-line tools.
//!
//! A destination type describes its fields once through a
//! [`Schema`](schema::Schema). From that description the crate can
//!
//! - coerce loosely typed values into each field ([`coerce`]),
//! - copy a string-keyed mapping onto the fields by fuzzy name
//!   ([`mapper::map_to_struct`]),
//! - layer a home config file, an explicit config file and command-line
//!   flags onto the value ([`config::Loader`]).

pub mod coerce;
pub mod config;
pub mod constants;
pub mod env;
pub mod mapper;
pub mod paths;
pub mod process;
pub mod schema;
pub mod text;
pub mod timesync;
pub mod value;

pub use coerce::{AsSlot, CoerceError, Kind, Slot, convert, convert_slot};
pub use config::{LoadError, Loader};
pub use mapper::{FieldError, FieldErrors, MapOutcome, map_to_struct};
pub use schema::{Configurable, DestinationError, Schema};
pub use value::Value;
