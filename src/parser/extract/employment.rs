use std::sync::LazyLock;

use regex::Regex;

use crate::types::{ApplicationMode, EmploymentType, PositionLevel};

static ONLINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bonline\b").unwrap());
static OFFLINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\boffline\b").unwrap());

/// Keyword precedence, highest first.
const EMPLOYMENT_KEYWORDS: &[(&[&str], EmploymentType)] = &[
    (&["permanent", "regular"], EmploymentType::Permanent),
    (&["contract"], EmploymentType::Contract),
    (&["temporary", "ad hoc", "ad-hoc"], EmploymentType::Temporary),
    (&["internship"], EmploymentType::Internship),
    (&["apprenticeship", "apprentice"], EmploymentType::Apprenticeship),
];

const LEVEL_KEYWORDS: &[(&str, PositionLevel)] = &[
    ("director", PositionLevel::Director),
    ("manager", PositionLevel::Manager),
    ("officer", PositionLevel::Officer),
    ("assistant", PositionLevel::Assistant),
    ("clerk", PositionLevel::Clerk),
];

pub fn employment_type(text: &str) -> EmploymentType {
    let lower = text.to_lowercase();
    EMPLOYMENT_KEYWORDS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)))
        .map(|(_, kind)| *kind)
        .unwrap_or_default()
}

/// Derived from the title only.
pub fn position_level(title: &str) -> PositionLevel {
    let lower = title.to_lowercase();
    LEVEL_KEYWORDS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, level)| *level)
        .unwrap_or_default()
}

pub fn application_mode(text: &str) -> ApplicationMode {
    match (ONLINE_RE.is_match(text), OFFLINE_RE.is_match(text)) {
        (true, true) => ApplicationMode::Both,
        (false, true) => ApplicationMode::Offline,
        _ => ApplicationMode::Online,
    }
}
