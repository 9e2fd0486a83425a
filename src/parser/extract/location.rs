use std::sync::LazyLock;

use regex::Regex;

use crate::types::LocationInfo;

/// Canonical region order. Matches are reported in this order, not in the
/// order they appear in the text.
pub const INDIAN_STATES: &[&str] = &[
    "Andhra Pradesh",
    "Arunachal Pradesh",
    "Assam",
    "Bihar",
    "Chhattisgarh",
    "Goa",
    "Gujarat",
    "Haryana",
    "Himachal Pradesh",
    "Jharkhand",
    "Karnataka",
    "Kerala",
    "Madhya Pradesh",
    "Maharashtra",
    "Manipur",
    "Meghalaya",
    "Mizoram",
    "Nagaland",
    "Odisha",
    "Punjab",
    "Rajasthan",
    "Sikkim",
    "Tamil Nadu",
    "Telangana",
    "Tripura",
    "Uttar Pradesh",
    "Uttarakhand",
    "West Bengal",
    "Andaman and Nicobar Islands",
    "Chandigarh",
    "Dadra and Nagar Haveli and Daman and Diu",
    "Delhi",
    "Jammu and Kashmir",
    "Ladakh",
    "Lakshadweep",
    "Puducherry",
];

static ALL_INDIA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:all|pan|throughout|across)[\s\-]*india\b").unwrap()
});

static STATE_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    INDIAN_STATES
        .iter()
        .map(|s| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(s).replace(' ', r"\s+"));
            (*s, Regex::new(&pattern).unwrap())
        })
        .collect()
});

static CITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:job location|place of posting|location|based in|posted at)\s*[:\-]?\s*([A-Z][A-Za-z]+(?:(?:\s*[,/&]\s*|\s+and\s+|\s+)[A-Z][A-Za-z]+)*)",
    )
    .unwrap()
});
static CITY_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:[,/&]|\band\b)\s*").unwrap());

pub fn extract(text: &str) -> LocationInfo {
    let cities = extract_cities(text);

    if ALL_INDIA_RE.is_match(text) {
        return LocationInfo {
            states: INDIAN_STATES.iter().map(|s| s.to_string()).collect(),
            cities,
            is_all_india: true,
        };
    }

    let states = STATE_RES
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(name, _)| name.to_string())
        .collect();

    LocationInfo {
        states,
        cities,
        is_all_india: false,
    }
}

/// Best-effort: names listed after a location label, minus anything that is
/// itself a recognized region.
fn extract_cities(text: &str) -> Vec<String> {
    let Some(caps) = CITY_RE.captures(text) else {
        return Vec::new();
    };

    let mut cities: Vec<String> = Vec::new();
    for part in CITY_SPLIT_RE.split(&caps[1]) {
        let name = part.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("india") {
            continue;
        }
        if INDIAN_STATES.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            continue;
        }
        if !cities.iter().any(|c| c.eq_ignore_ascii_case(name)) {
            cities.push(name.to_string());
        }
    }
    cities
}
