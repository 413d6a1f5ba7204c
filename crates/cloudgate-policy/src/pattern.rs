//! Glob matching over resource identifiers.
//!
//! Globs support a single metacharacter, `*`, matching zero or more
//! characters. Everything else is literal. A glob always spans the whole
//! value.

use regex::{Regex, RegexBuilder};

/// Translate a glob into an anchored regex.
fn compile_glob(pattern: &str, case_insensitive: bool) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    RegexBuilder::new(&format!("^{}$", body))
        .case_insensitive(case_insensitive)
        .build()
}

/// Check whether `value` matches the glob `pattern`.
pub fn glob_matches(pattern: &str, value: &str, case_insensitive: bool) -> bool {
    match compile_glob(pattern, case_insensitive) {
        Ok(re) => re.is_match(value),
        Err(e) => {
            // Escaped globs always compile unless they exceed the size limit.
            tracing::warn!(pattern = %pattern, error = %e, "glob could not be compiled");
            false
        }
    }
}

/// Match a protected-resource pattern against a value.
///
/// Case-insensitive. Patterns containing `*` are globs; anything else is a
/// substring test.
pub fn protected_pattern_matches(pattern: &str, value: &str) -> bool {
    if pattern.contains('*') {
        glob_matches(pattern, value, true)
    } else {
        value.to_lowercase().contains(&pattern.to_lowercase())
    }
}
