//! The closed set of standard-library header names eligible for
//! system-include deduplication.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// The implementation-all-in-one umbrella header. Once emitted, it
/// subsumes every subsequently recognized standard-library include.
pub const UMBRELLA_HEADER: &str = "bits/stdc++.h";

const CXX_STANDARD_HEADERS: &[&str] = &[
    "algorithm",
    "array",
    "bitset",
    "chrono",
    "codecvt",
    "complex",
    "condition_variable",
    "deque",
    "exception",
    "forward_list",
    "fstream",
    "functional",
    "future",
    "iomanip",
    "ios",
    "iosfwd",
    "iostream",
    "istream",
    "iterator",
    "limits",
    "list",
    "locale",
    "map",
    "memory",
    "mutex",
    "new",
    "numeric",
    "ostream",
    "queue",
    "random",
    "regex",
    "set",
    "sstream",
    "stack",
    "stdexcept",
    "streambuf",
    "string",
    "thread",
    "tuple",
    "typeinfo",
    "unordered_map",
    "unordered_set",
    "utility",
    "valarray",
    "vector",
];

const C_STANDARD_HEADERS: &[&str] = &[
    "assert.h",
    "complex.h",
    "ctype.h",
    "errno.h",
    "fenv.h",
    "float.h",
    "inttypes.h",
    "iso646.h",
    "limits.h",
    "locale.h",
    "math.h",
    "setjmp.h",
    "signal.h",
    "stdalign.h",
    "stdarg.h",
    "stdatomic.h",
    "stdbool.h",
    "stddef.h",
    "stdint.h",
    "stdio.h",
    "stdlib.h",
    "stdnoreturn.h",
    "string.h",
    "tgmath.h",
    "threads.h",
    "time.h",
    "uchar.h",
    "wchar.h",
    "wctype.h",
];

/// The full closed set: the umbrella header, all C++ standard headers,
/// all C standard `.h` headers, and their `c`-prefixed, suffix-stripped
/// variants (e.g. `stdio.h` -> `cstdio`).
pub static STANDARD_LIBRARY_NAMES: Lazy<HashSet<String>> = Lazy::new(|| {
    let mut names: HashSet<String> = HashSet::new();
    names.insert(UMBRELLA_HEADER.to_string());
    names.extend(CXX_STANDARD_HEADERS.iter().map(|s| s.to_string()));
    names.extend(C_STANDARD_HEADERS.iter().map(|s| s.to_string()));
    for header in C_STANDARD_HEADERS {
        let stem = header.strip_suffix(".h").unwrap_or(header);
        names.insert(format!("c{stem}"));
    }
    names
});

/// Whether `name` is in the closed standard-library set.
pub fn is_standard_library(name: &str) -> bool {
    STANDARD_LIBRARY_NAMES.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_cxx_headers() {
        assert!(is_standard_library("vector"));
        assert!(is_standard_library("algorithm"));
    }

    #[test]
    fn recognizes_c_headers_both_forms() {
        assert!(is_standard_library("stdio.h"));
        assert!(is_standard_library("cstdio"));
    }

    #[test]
    fn recognizes_umbrella() {
        assert!(is_standard_library(UMBRELLA_HEADER));
    }

    #[test]
    fn rejects_unknown_names() {
        assert!(!is_standard_library("not_a_real_header.h"));
        assert!(!is_standard_library("myheader.hpp"));
    }
}
