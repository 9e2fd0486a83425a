use std::sync::LazyLock;

use regex::Regex;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\p{Cc}]+").unwrap());

/// Trim and collapse every run of whitespace or control characters to a
/// single space. Idempotent, never grows the input.
pub fn clean(text: &str) -> String {
    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Cut to at most `max` chars without splitting a code point.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}

/// Parse an integer that may carry Indian or western digit grouping
/// ("1,42,400", "44,900"). Anything unparsable is treated as absent.
pub fn parse_grouped<T: std::str::FromStr>(raw: &str) -> Option<T> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    digits.parse().ok()
}
