//! Bundler engine: recursive inclusion, guard/pragma-once discipline,
//! conditional-nesting tracking, system-include deduplication, and
//! `#line` emission.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::error::{relative_to_cwd, BundleError, Result};
use crate::resolver;
use crate::stdlib;
use crate::stripper;

struct Directives {
    conditional_open: Regex,
    else_elif: Regex,
    endif: Regex,
    pragma_once: Regex,
    ifndef_guard: Regex,
    define_guard: Regex,
    include_system: Regex,
    include_user: Regex,
}

static DIRECTIVES: Lazy<Directives> = Lazy::new(|| Directives {
    conditional_open: Regex::new(r"^\s*#\s*(if|ifdef|ifndef)\s").unwrap(),
    else_elif: Regex::new(r"^\s*#\s*(else\s*|elif\s)").unwrap(),
    endif: Regex::new(r"^\s*#\s*endif\s*").unwrap(),
    pragma_once: Regex::new(r"^\s*#\s*pragma\s+once\s*").unwrap(),
    ifndef_guard: Regex::new(r"^\s*#\s*ifndef\s+(\w+)\s*").unwrap(),
    define_guard: Regex::new(r"^\s*#\s*define\s+(\w+)\b").unwrap(),
    // Anchored to end of line, unlike the other directives here.
    include_system: Regex::new(r#"^\s*#\s*include\s*<([^>]*)>\s*$"#).unwrap(),
    include_user: Regex::new(r#"^\s*#\s*include\s*"([^"]*)"\s*$"#).unwrap(),
});

/// Builder for [`Bundler`].
pub struct BundlerBuilder {
    search_dirs: Vec<PathBuf>,
    compiler: String,
}

impl BundlerBuilder {
    pub fn new() -> Self {
        Self {
            search_dirs: Vec::new(),
            compiler: std::env::var("CXX").unwrap_or_else(|_| "g++".to_string()),
        }
    }

    /// Append a user-include search directory, in the order it should be
    /// consulted after the including file's own directory.
    pub fn search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    /// Replace the whole user-include search path.
    pub fn search_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.search_dirs = dirs.into_iter().collect();
        self
    }

    /// Override the compiler driver (defaults to `$CXX`, or `g++`).
    pub fn compiler(mut self, driver: impl Into<String>) -> Self {
        self.compiler = driver.into();
        self
    }

    pub fn build(self) -> Bundler {
        Bundler {
            search_dirs: self.search_dirs,
            compiler: self.compiler,
            seen_guarded: HashSet::new(),
            seen_system: HashSet::new(),
            path_stack: HashSet::new(),
            out: Vec::new(),
        }
    }
}

impl Default for BundlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-file transient guard/pragma-once state, tracked across the line
/// loop of a single `update_inner` call.
#[derive(Default)]
struct GuardState {
    pragma_once_found: bool,
    macro_name: Option<Vec<u8>>,
    define_found: bool,
    endif_found: bool,
    non_guard_found: bool,
}

/// Drives recursive inclusion of a single translation unit into one
/// self-contained byte stream.
///
/// Holds mutable per-run state (`seen_guarded`, `seen_system`,
/// `path_stack`, `out`) and is meant for single-threaded, one-shot use:
/// build one per translation unit rather than sharing an instance.
pub struct Bundler {
    search_dirs: Vec<PathBuf>,
    compiler: String,
    seen_guarded: HashSet<PathBuf>,
    seen_system: HashSet<String>,
    path_stack: HashSet<PathBuf>,
    out: Vec<Vec<u8>>,
}

impl Bundler {
    /// Entry contract: skip files already bundled under guard/pragma-once
    /// discipline, reject re-entry into a file currently on the include
    /// stack (a cycle), otherwise recurse.
    pub fn update(&mut self, path: &Path) -> Result<()> {
        let canonical = path.canonicalize()?;

        if self.seen_guarded.contains(&canonical) {
            log::debug!(
                "{}: skipped, already included under guard/pragma-once discipline",
                canonical.display()
            );
            return Ok(());
        }

        if self.path_stack.contains(&canonical) {
            return Err(BundleError::cycle(canonical));
        }

        self.path_stack.insert(canonical.clone());
        let result = self.update_inner(&canonical);
        self.path_stack.remove(&canonical);
        result
    }

    /// Concatenate the emitted lines into the final bundled byte stream.
    pub fn finish(self) -> Vec<u8> {
        self.out.concat()
    }

    fn update_inner(&mut self, path: &Path) -> Result<()> {
        log::info!("bundling {}", path.display());

        let (raw_lines, stripped_lines) = self.line_view(path)?;
        let line_count = raw_lines.len();

        self.emit_line(1, path);

        let mut nest: i64 = 0;
        let mut guard = GuardState::default();

        for i in 0..line_count {
            let raw_line = &raw_lines[i];
            let stripped_line = &stripped_lines[i];
            let line_number = (i + 1) as i64;

            if DIRECTIVES.conditional_open.is_match(stripped_line) {
                nest += 1;
            }
            if DIRECTIVES.else_elif.is_match(stripped_line) && nest == 0 {
                return Err(BundleError::structural_at(
                    path,
                    line_number,
                    "unmatched #else / #elif",
                ));
            }
            if DIRECTIVES.endif.is_match(stripped_line) {
                nest -= 1;
                if nest < 0 {
                    return Err(BundleError::structural_at(
                        path,
                        line_number,
                        "unmatched #endif",
                    ));
                }
            }
            let is_top_level = nest == 0 || (nest == 1 && guard.macro_name.is_some());

            // Recognized against the raw view; GCC strips it like a comment.
            if DIRECTIVES.pragma_once.is_match(raw_line) {
                if guard.non_guard_found {
                    return Err(BundleError::policy_at(
                        path,
                        line_number,
                        "#pragma once found in a non-first line",
                    ));
                }
                if guard.macro_name.is_some() {
                    return Err(BundleError::policy_at(
                        path,
                        line_number,
                        "#pragma once found in an include guard with #ifndef",
                    ));
                }
                if self.seen_guarded.contains(path) {
                    return Ok(());
                }
                guard.pragma_once_found = true;
                self.seen_guarded.insert(path.to_path_buf());
                self.emit_line(line_number + 1, path);
                continue;
            }

            // `#ifndef M` as a guard candidate (first opportunity only).
            if !guard.pragma_once_found && !guard.non_guard_found && guard.macro_name.is_none() {
                if let Some(captures) = DIRECTIVES.ifndef_guard.captures(stripped_line) {
                    guard.macro_name = Some(captures[1].to_vec());
                    self.emit_blank();
                    continue;
                }
            }

            // Matching `#define M` accepts the guard.
            if let Some(macro_name) = guard.macro_name.clone() {
                if !guard.define_found {
                    if let Some(captures) = DIRECTIVES.define_guard.captures(stripped_line) {
                        if &captures[1] == macro_name.as_slice() {
                            self.seen_guarded.insert(path.to_path_buf());
                            guard.define_found = true;
                            self.emit_blank();
                            continue;
                        }
                    }
                }
            }

            // The matching `#endif` closes the guard.
            if guard.define_found && nest == 0 && !guard.endif_found {
                if DIRECTIVES.endif.is_match(stripped_line) {
                    guard.endif_found = true;
                    self.emit_blank();
                    continue;
                }
            }

            if !stripped_line.is_empty() {
                guard.non_guard_found = true;
                if guard.macro_name.is_some() && !guard.define_found {
                    // Not a guard after all.
                    guard.macro_name = None;
                }
                if guard.endif_found {
                    return Err(BundleError::policy_at(
                        path,
                        line_number,
                        "found code outside include guard",
                    ));
                }
            }

            if let Some(captures) = DIRECTIVES.include_system.captures(stripped_line) {
                let name = String::from_utf8_lossy(&captures[1]).into_owned();
                if self.seen_system.contains(&name)
                    || self.seen_system.contains(stdlib::UMBRELLA_HEADER)
                {
                    self.emit_line(line_number + 1, path);
                } else if is_top_level && stdlib::is_standard_library(&name) {
                    self.seen_system.insert(name);
                    self.emit_raw(raw_line);
                } else {
                    // Unrecognized or conditional; can't safely dedupe.
                    self.emit_raw(raw_line);
                }
                continue;
            }

            if let Some(captures) = DIRECTIVES.include_user.captures(stripped_line) {
                if !is_top_level {
                    return Err(BundleError::policy_at(
                        path,
                        line_number,
                        "cannot process #include inside a conditional other than the guard",
                    ));
                }
                let header = String::from_utf8_lossy(&captures[1]).into_owned();
                let resolved = resolver::resolve(&header, path, &self.search_dirs)?;
                self.update(&resolved)?;
                self.emit_line(line_number + 1, path);
                continue;
            }

            self.emit_raw(raw_line);
        }

        if nest != 0 {
            return Err(BundleError::structural_at(
                path,
                line_count as i64,
                "unmatched #if / #ifdef / #ifndef",
            ));
        }
        if guard.macro_name.is_some() && !guard.endif_found {
            return Err(BundleError::structural_at(
                path,
                line_count as i64,
                "unmatched #ifndef",
            ));
        }

        Ok(())
    }

    /// Read the raw bytes of `path` and pair them with the comment-free
    /// view from the stripper, padding the stripped side with empty
    /// lines so the two sequences have equal length.
    fn line_view(&self, path: &Path) -> Result<(Vec<Vec<u8>>, Vec<Vec<u8>>)> {
        let mut raw = fs::read(path)?;
        if !raw.ends_with(b"\n") {
            raw.push(b'\n');
        }
        let raw_lines: Vec<Vec<u8>> = raw
            .split_inclusive(|&b| b == b'\n')
            .map(|l| l.to_vec())
            .collect();

        let stripped_bytes = stripper::strip(path, &self.search_dirs, &self.compiler)?;
        let mut stripped_lines: Vec<Vec<u8>> = stripped_bytes
            .split_inclusive(|&b| b == b'\n')
            .map(|l| {
                l.strip_suffix(b"\n").unwrap_or(l).to_vec()
            })
            .collect();
        while stripped_lines.len() < raw_lines.len() {
            stripped_lines.push(Vec::new());
        }

        Ok((raw_lines, stripped_lines))
    }

    /// Pop any pending `#line` directive at the tail of the output
    /// buffer, then append the new one. Coalescing this way means only
    /// the last of a run of consecutive `#line`s survives.
    fn emit_line(&mut self, line: i64, path: &Path) {
        while matches!(self.out.last(), Some(last) if last.starts_with(b"#line ")) {
            self.out.pop();
        }
        let display = relative_to_cwd(path);
        self.out
            .push(format!("#line {line} \"{display}\"\n").into_bytes());
    }

    fn emit_raw(&mut self, line: &[u8]) {
        self.out.push(line.to_vec());
    }

    fn emit_blank(&mut self) {
        self.out.push(b"\n".to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn bundler() -> Bundler {
        BundlerBuilder::new().build()
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    // Requires a real g++/clang on PATH; ignored in CI.

    #[test]
    #[ignore = "requires a gcc-compatible g++/clang on PATH"]
    fn pragma_once_included_twice_emits_once() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.h", "#pragma once\nint x;\n");
        let main = write(
            &dir,
            "main.cc",
            "#include \"a.h\"\n#include \"a.h\"\n",
        );

        let mut b = bundler();
        b.update(&main).unwrap();
        let out = String::from_utf8(b.finish()).unwrap();
        assert_eq!(out.matches("int x;").count(), 1);
    }

    #[test]
    #[ignore = "requires a gcc-compatible g++/clang on PATH"]
    fn classic_guard_included_twice_emits_once() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "a.h",
            "#ifndef A_H\n#define A_H\nint y;\n#endif\n",
        );
        let main = write(
            &dir,
            "main.cc",
            "#include \"a.h\"\n#include \"a.h\"\n",
        );

        let mut b = bundler();
        b.update(&main).unwrap();
        let out = String::from_utf8(b.finish()).unwrap();
        assert_eq!(out.matches("int y;").count(), 1);
    }

    #[test]
    fn conditional_regex_is_whitespace_tolerant() {
        assert!(DIRECTIVES.conditional_open.is_match(b"  #   ifndef FOO"));
        assert!(DIRECTIVES.endif.is_match(b"  #endif  "));
        assert!(DIRECTIVES.pragma_once.is_match(b"#pragma   once"));
    }

    #[test]
    fn include_angle_captures_name() {
        let caps = DIRECTIVES.include_system.captures(b"#include <vector>").unwrap();
        assert_eq!(&caps[1], b"vector");
    }

    #[test]
    fn include_quote_captures_name() {
        let caps = DIRECTIVES
            .include_user
            .captures(b"#include \"a.h\"")
            .unwrap();
        assert_eq!(&caps[1], b"a.h");
    }

    #[test]
    fn cycle_detection_without_stripper() {
        // Insert directly into path_stack to test the cycle branch alone.
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.h", "");
        let canonical = path.canonicalize().unwrap();

        let mut b = bundler();
        b.path_stack.insert(canonical.clone());
        let err = b.update(&path).unwrap_err();
        assert!(matches!(err, BundleError::Cycle { .. }));
    }
}
