//! Identifier-normalized wildcard matching for output verification.
//!
//! The execution engine may add hash or timestamp infixes to filenames, so
//! the verifier never does exact matching. An expected filename is satisfied
//! by any observed name matching `*<unique_id>*<expected-with-id-stripped>*`,
//! the same fnmatch pattern the pipeline has always used. Tightening this to
//! exact matching would reject legitimate runs.

use regex::Regex;

/// Compile an fnmatch-style pattern (`*` and `?` wildcards) into an
/// anchored regex.
pub fn wildcard_to_regex(pattern: &str) -> Result<Regex, String> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|err| format!("invalid pattern '{pattern}': {err}"))
}

/// True if `observed` satisfies `expected` for the given `unique_id`.
///
/// The observed name must contain the `unique_id` and, after it, the
/// expected filename with any literal occurrence of the id stripped out.
pub fn matches_expected(observed: &str, unique_id: &str, expected: &str) -> bool {
    let remainder = expected.replace(unique_id, "");
    let pattern = format!("*{unique_id}*{remainder}*");
    match wildcard_to_regex(&pattern) {
        Ok(regex) => regex.is_match(observed),
        Err(_) => false,
    }
}

/// True if any observed name satisfies `expected`.
pub fn any_matches<S: AsRef<str>>(observed: &[S], unique_id: &str, expected: &str) -> bool {
    observed
        .iter()
        .any(|name| matches_expected(name.as_ref(), unique_id, expected))
}
