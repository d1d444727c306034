//! Crate-wide constants.

/// Directory under the user's home holding per-application config
/// directories.
pub const CONFIG_DIR: &str = ".config";

/// Conventional file name of a home config.
pub const DEFAULT_CONFIG_NAME: &str = "config.toml";
