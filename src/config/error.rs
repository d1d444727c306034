//! Configuration loading error types.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::mapper::FieldErrors;
use crate::schema::DestinationError;

/// Errors raised by a [`Decoder`](super::Decoder) for one source.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Failed to read a configuration file.
    #[error("failed to read config file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The text is not valid TOML.
    #[error("{0}")]
    Parse(#[from] toml::de::Error),

    /// The text parsed but some fields could not be written.
    #[error("{0}")]
    Fields(FieldErrors),
}

/// Which configuration source a [`LayerError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Layer {
    #[strum(serialize = "home config")]
    Home,
    #[strum(serialize = "config file")]
    File,
    #[strum(serialize = "command line")]
    CommandLine,
}

/// Failure of one layer. Layers never abort the load; their errors are
/// collected into [`LoadError::Layers`].
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("error parsing config file '{}':\n{source}", path.display())]
    File {
        layer: Layer,
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    /// The tokens did not form a valid flag list.
    #[error("error parsing command line:\n{message}")]
    Flags { message: String },

    /// The flags parsed but their values could not be applied.
    #[error("error parsing command line:\n{0}")]
    CommandLine(#[source] DecodeError),
}

impl LayerError {
    pub fn layer(&self) -> Layer {
        match self {
            LayerError::File { layer, .. } => *layer,
            LayerError::Flags { .. } | LayerError::CommandLine(_) => Layer::CommandLine,
        }
    }
}

/// Errors returned by [`Loader::load`](super::Loader::load).
#[derive(Debug, Error)]
pub enum LoadError {
    /// Raised before any source is touched.
    #[error(transparent)]
    InvalidDestination(#[from] DestinationError),

    #[error("{0}")]
    Layers(LayerErrors),
}

impl LoadError {
    /// Layer errors, empty for a destination error.
    pub fn layers(&self) -> &[LayerError] {
        match self {
            LoadError::InvalidDestination(_) => &[],
            LoadError::Layers(errors) => &errors.0,
        }
    }
}

/// Every failed layer of one load, rendered one per line.
#[derive(Debug, Default)]
pub struct LayerErrors(pub Vec<LayerError>);

impl fmt::Display for LayerErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.0.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n");
        f.write_str(joined.trim_end())
    }
}
