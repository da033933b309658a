//! Invokes the external preprocessor to obtain a line-aligned,
//! comment-free view of a source file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::error::{BundleError, Result};
use crate::probe::require_gcc_like;

type CacheKey = (PathBuf, Vec<PathBuf>, String);

static STRIP_CACHE: Lazy<Mutex<HashMap<CacheKey, Vec<u8>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

static LINEMARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^# (\d+) ".*""#).unwrap());

/// Invoke `driver` to strip comments from `path`, leaving `#define`s
/// intact, and return a byte buffer whose line `N` aligns with source
/// line `N` of the original file.
///
/// Memoized on `(canonical path, absolute include dirs, driver)`; the
/// cache is write-once per key for the lifetime of the process.
pub fn strip(path: &Path, include_dirs: &[PathBuf], driver: &str) -> Result<Vec<u8>> {
    require_gcc_like(driver)?;

    let canonical = path.canonicalize()?;
    let abs_dirs: Vec<PathBuf> = include_dirs
        .iter()
        .map(|d| d.canonicalize().unwrap_or_else(|_| d.clone()))
        .collect();
    let key: CacheKey = (canonical.clone(), abs_dirs.clone(), driver.to_string());

    if let Some(cached) = STRIP_CACHE.lock().unwrap().get(&key) {
        return Ok(cached.clone());
    }

    let mut command = Command::new(driver);
    for dir in &abs_dirs {
        command.arg("-I").arg(dir);
    }
    command
        .arg("-fpreprocessed")
        .arg("-dD")
        .arg("-E")
        .arg(&canonical);

    log::debug!("invoking preprocessor: {:?}", command);
    let output = command
        .output()
        .map_err(|e| BundleError::configuration(format!("failed to run {driver}: {e}")))?;

    if !output.status.success() {
        return Err(BundleError::configuration(format!(
            "{driver} failed on {}: {}{}",
            canonical.display(),
            String::from_utf8_lossy(&output.stderr),
            String::from_utf8_lossy(&output.stdout)
        )));
    }

    let stripped = align_linemarkers(&output.stdout);
    STRIP_CACHE
        .lock()
        .unwrap()
        .insert(key, stripped.clone());
    Ok(stripped)
}

/// Walk GCC-style linemarker output (`# N "file" [flags]`), dropping each
/// linemarker and padding the output with blank lines so that output
/// line `N` aligns with the marker's reported line `N`.
fn align_linemarkers(raw: &[u8]) -> Vec<u8> {
    let mut lines: Vec<Vec<u8>> = Vec::new();
    for line in raw.split_inclusive(|&b| b == b'\n') {
        let content = line.strip_suffix(b"\n").unwrap_or(line);
        let content = content.strip_suffix(b"\r").unwrap_or(content);
        if let Some(captures) = LINEMARKER.captures(content) {
            let lineno: usize = std::str::from_utf8(&captures[1])
                .unwrap()
                .parse()
                .unwrap_or(0);
            while lines.len() + 1 < lineno {
                lines.push(b"\n".to_vec());
            }
        } else {
            lines.push(line.to_vec());
        }
    }
    lines.concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_output_to_marker_line() {
        let raw = b"# 3 \"a.h\"\nint x;\n";
        let stripped = align_linemarkers(raw);
        let lines: Vec<&[u8]> = stripped.split(|&b| b == b'\n').collect();
        assert_eq!(lines[0], b"");
        assert_eq!(lines[1], b"");
        assert_eq!(lines[2], b"int x;");
    }

    #[test]
    fn passes_through_non_marker_lines() {
        let raw = b"int x;\nint y;\n";
        let stripped = align_linemarkers(raw);
        assert_eq!(stripped, raw.to_vec());
    }

    #[test]
    fn drops_consecutive_linemarkers_without_extra_padding() {
        let raw = b"# 1 \"a.h\"\n# 2 \"a.h\"\nint x;\n";
        let stripped = align_linemarkers(raw);
        let lines: Vec<&[u8]> = stripped.split(|&b| b == b'\n').collect();
        assert_eq!(lines[0], b"");
        assert_eq!(lines[1], b"int x;");
    }
}
