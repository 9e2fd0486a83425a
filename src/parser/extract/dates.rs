use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use tracing::debug;

use crate::types::DateInfo;

/// A date-shaped token: numeric day/month/year, ISO, or a named month.
const DATE_TOKEN: &str = r"(\d{4}-\d{1,2}-\d{1,2}|\d{1,2}[/.\-]\d{1,2}[/.\-]\d{4}|\d{1,2}(?:st|nd|rd|th)?[\s\-]+[A-Za-z]{3,9}\.?,?[\s\-]+\d{4}|[A-Za-z]{3,9}\.?\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4})";

fn labeled(labels: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{labels})\b[\s:\-–]*(?:on|is|by|upto|up to)?[\s:\-–]*{DATE_TOKEN}")).unwrap()
}

static END_RE: LazyLock<Regex> =
    LazyLock::new(|| labeled(r"last date|closing date|end date|last date of application|closing date of application"));
static START_RE: LazyLock<Regex> =
    LazyLock::new(|| labeled(r"start date|opening date|starting date|commencement|from"));
static NOTIFICATION_RE: LazyLock<Regex> =
    LazyLock::new(|| labeled(r"notification date|date of notification|notification|published|advertisement date"));
static EXAM_RE: LazyLock<Regex> =
    LazyLock::new(|| labeled(r"exam date|examination date|date of exam|date of examination|cbt date"));
static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d)(?:st|nd|rd|th)\b").unwrap());
/// chrono's `%b` knows "Sep" only.
static SEPT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bsept\b").unwrap());

/// Tried in order against a token with commas and abbreviation dots
/// already removed; first layout that parses wins. Day-first layouts come
/// before month-first so "05/04/2024" reads as 5 April.
const LAYOUTS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Each role is searched independently; a miss on one never blocks another.
pub fn extract(text: &str) -> DateInfo {
    DateInfo {
        notification: find(&NOTIFICATION_RE, text),
        application_start: find(&START_RE, text),
        application_end: find(&END_RE, text),
        exam: find(&EXAM_RE, text),
    }
}

fn find(re: &Regex, text: &str) -> Option<NaiveDate> {
    let caps = re.captures(text)?;
    parse_date(&caps[1])
}

/// Parse a free-standing date token against the known layouts, then as a
/// generic RFC 3339 / RFC 2822 timestamp.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let token = normalize_token(raw);
    if token.is_empty() {
        return None;
    }

    for layout in LAYOUTS {
        if let Ok(d) = NaiveDate::parse_from_str(&token, layout) {
            return Some(d);
        }
    }

    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }

    debug!(token = %token, "could not parse date");
    None
}

fn normalize_token(raw: &str) -> String {
    let stripped = ORDINAL_RE.replace_all(raw.trim(), "$1");
    let flat = stripped.replace(". ", " ").replace(".,", " ").replace(',', " ");
    let flat = SEPT_RE.replace_all(&flat, "Sep");
    flat.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find the first date-shaped token anywhere in `text`.
pub fn first_date_token(text: &str) -> Option<String> {
    static ANY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(DATE_TOKEN).unwrap());
    ANY_RE.find(text).map(|m| m.as_str().to_string())
}
