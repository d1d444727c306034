//! Environment abstraction for testability.
//!
//! Production code uses [`Env::real()`], which reads the process
//! environment and asks [`dirs`] for the home directory. Tests and
//! embedders use [`Env::fixed()`] backed by a `HashMap`, so nothing ever
//! needs `unsafe` calls to [`std::env::set_var`].

use std::collections::HashMap;
use std::path::PathBuf;

/// Variable consulted for the home directory by a fixed environment.
pub const HOME_VAR: &str = "HOME";

/// Environment reader.
#[derive(Clone, Debug, Default)]
pub struct Env {
    overrides: Option<HashMap<String, String>>,
}

impl Env {
    /// Create an `Env` that reads from the real process environment.
    pub fn real() -> Self {
        Self { overrides: None }
    }

    /// Create an `Env` backed by explicit key-value pairs. Variables not
    /// listed are absent, including `HOME`.
    pub fn fixed(vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self {
            overrides: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// Look up an environment variable by name.
    pub fn var(&self, name: &str) -> Result<String, std::env::VarError> {
        match &self.overrides {
            Some(map) => map.get(name).cloned().ok_or(std::env::VarError::NotPresent),
            None => std::env::var(name),
        }
    }

    /// The current user's home directory, if it can be determined.
    pub fn home_dir(&self) -> Option<PathBuf> {
        match &self.overrides {
            Some(map) => map.get(HOME_VAR).filter(|h| !h.is_empty()).map(PathBuf::from),
            None => dirs::home_dir(),
        }
    }
}
