//! Path normalization and existence checks.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::env::Env;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("could not determine home directory")]
    NoHomeDirectory,

    #[error("could not resolve current directory: {0}")]
    CurrentDir(#[from] io::Error),
}

/// Expand a leading `~` and make `path` absolute, using the real
/// environment.
pub fn normalize_path(path: impl AsRef<Path>) -> Result<PathBuf, PathError> {
    normalize_path_with(path, &Env::real())
}

/// Expand a leading `~` through `env`, make the path absolute against the
/// current directory, and fold `.` and `..` lexically.
pub fn normalize_path_with(path: impl AsRef<Path>, env: &Env) -> Result<PathBuf, PathError> {
    let path = path.as_ref();
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => env.home_dir().ok_or(PathError::NoHomeDirectory)?.join(rest),
        Err(_) => path.to_path_buf(),
    };
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };
    Ok(clean(&absolute))
}

/// Whether `path` exists after normalization.
///
/// Only a definite "not found" counts as absent; a path we may not stat
/// (permissions) is reported as existing.
pub fn exists(path: impl AsRef<Path>) -> bool {
    exists_with(path, &Env::real())
}

pub fn exists_with(path: impl AsRef<Path>, env: &Env) -> bool {
    match normalize_path_with(path, env) {
        Ok(path) => match std::fs::metadata(path) {
            Ok(_) => true,
            Err(e) => e.kind() != io::ErrorKind::NotFound,
        },
        Err(_) => false,
    }
}

fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `pop` refuses to remove the root, matching `/..` == `/`.
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
