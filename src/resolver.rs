//! `#include "..."` resolution against the including file's directory and
//! the configured user-include search path.

use std::path::{Path, PathBuf};

use crate::error::{BundleError, Result};

/// Resolve `header` (the literal text between the quotes of a
/// `#include "header"` directive) relative to the file it was included
/// from, then against each of `search_dirs` in order.
///
/// This is the "current-including-file" rule, not resolution against the
/// translation-unit root: each nested include resolves relative to its
/// own parent.
pub fn resolve(header: &str, from: &Path, search_dirs: &[PathBuf]) -> Result<PathBuf> {
    let from_dir = from.parent().unwrap_or_else(|| Path::new("."));
    let candidate = from_dir.join(header);
    if candidate.is_file() {
        return canonicalize(&candidate);
    }

    for dir in search_dirs {
        let candidate = dir.join(header);
        if candidate.is_file() {
            return canonicalize(&candidate);
        }
    }

    Err(BundleError::resolution(header))
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    Ok(path.canonicalize()?)
}
