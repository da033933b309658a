//! Bundler error types

use std::path::{Path, PathBuf};

/// Bundler error types.
///
/// Two shapes: a generic [`BundleError::Configuration`] /
/// [`BundleError::Io`] / [`BundleError::Resolution`] failure, and a
/// located failure ([`BundleError::Structural`], [`BundleError::Policy`],
/// [`BundleError::Cycle`]) carrying the file and line at which it was
/// detected. `line == -1` means the error pertains to the file as a
/// whole rather than one line of it.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// Compiler driver missing or misidentified.
    #[error("{0}")]
    Configuration(String),

    /// File I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `#include` could not be resolved against any search directory.
    #[error("no such header: {header}")]
    Resolution { header: String },

    /// Unmatched `#else`/`#elif`/`#endif`/`#ifndef`.
    #[error("{}: line {line}: {message}", relative_to_cwd(path))]
    Structural {
        path: PathBuf,
        line: i64,
        message: String,
    },

    /// `#pragma once`/guard misuse, or code outside a closed guard.
    #[error("{}: line {line}: {message}", relative_to_cwd(path))]
    Policy {
        path: PathBuf,
        line: i64,
        message: String,
    },

    /// Re-entry into a file already on the include stack.
    #[error("{}: cycle found in inclusion relations", relative_to_cwd(path))]
    Cycle { path: PathBuf },
}

/// Result type for bundler operations.
pub type Result<T> = std::result::Result<T, BundleError>;

impl BundleError {
    /// A generic configuration/driver failure (missing or misidentified
    /// compiler, bad search path, etc).
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// An unresolvable `#include`.
    pub fn resolution(header: impl Into<String>) -> Self {
        Self::Resolution {
            header: header.into(),
        }
    }

    /// A structural failure. `line == -1` means the error pertains to
    /// the file as a whole.
    pub fn structural_at(path: impl Into<PathBuf>, line: i64, message: impl Into<String>) -> Self {
        Self::Structural {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// A guard/pragma-once policy violation.
    pub fn policy_at(path: impl Into<PathBuf>, line: i64, message: impl Into<String>) -> Self {
        Self::Policy {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// A cycle detected while re-entering a file already on the stack.
    pub fn cycle(path: impl Into<PathBuf>) -> Self {
        Self::Cycle { path: path.into() }
    }
}

/// Renders `path` relative to the current working directory when it
/// lies underneath it, otherwise the path as given.
pub(crate) fn relative_to_cwd(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_mentions_path() {
        let err = BundleError::cycle(PathBuf::from("/tmp/a.h"));
        assert!(err.to_string().contains("cycle found"));
    }

    #[test]
    fn structural_message_includes_line() {
        let err = BundleError::structural_at(PathBuf::from("/tmp/a.h"), 3, "unmatched #endif");
        let rendered = err.to_string();
        assert!(rendered.contains("line 3"));
        assert!(rendered.contains("unmatched #endif"));
    }

    #[test]
    fn whole_file_errors_use_line_negative_one() {
        let err = BundleError::structural_at(PathBuf::from("/tmp/a.h"), -1, "cycle found");
        assert!(err.to_string().contains("line -1"));
    }
}
