//! Linker diagnostics classification
//!
//! Recognizes missing-library and undefined-symbol messages from GNU ld,
//! gold, lld, Apple ld64 and MSVC link.exe.

use regex::Regex;
use std::sync::LazyLock;

static UNDEFINED_SYMBOL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // GNU ld / gold: undefined reference to `pkgcraft_version'
        r"undefined reference to [`'‘]([^'’`]+)['’`]",
        // lld: undefined symbol: pkgcraft_version
        r"(?m)undefined symbol: ([^\s(]+)",
        // ld64:   "_pkgcraft_version", referenced from:
        r#"(?m)^\s*"_?([^"]+)", referenced from"#,
        // MSVC: unresolved external symbol pkgcraft_version referenced in ...
        r"unresolved external symbol ([^\s,]+)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("should build valid regex"))
    .collect()
});

static MISSING_LIBRARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:cannot find|unable to find library|library not found for) -l([^\s:']+)")
        .expect("should build valid regex")
});

/// Undefined symbols named in linker output, in order of first mention.
pub fn unresolved_symbols(diagnostics: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    for pattern in UNDEFINED_SYMBOL_PATTERNS.iter() {
        for caps in pattern.captures_iter(diagnostics) {
            if let Some(symbol) = caps.get(1)
                && !found.iter().any(|(_, s)| s == symbol.as_str())
            {
                found.push((symbol.start(), symbol.as_str().to_string()));
            }
        }
    }
    found.sort_by_key(|(position, _)| *position);
    found.into_iter().map(|(_, symbol)| symbol).collect()
}

/// Library the linker reports it could not find, if any.
pub fn missing_library(diagnostics: &str) -> Option<String> {
    MISSING_LIBRARY
        .captures(diagnostics)
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().to_string())
}
