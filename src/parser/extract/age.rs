use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::AgeInfo;

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bage\b.{0,60}?\b(\d{2})\s*(?:years?\s*)?(?:to|-|–)\s*(\d{2})\b").unwrap()
});
/// Numeric dates ("as on 01-08-2024") whose day-month part would otherwise
/// read as an age range.
static NUMERIC_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4})\b").unwrap()
});
static RELAXATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\brelaxation\b(.{0,300})").unwrap());
static CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(sc\s*/\s*st|obc|sc|st|pwd|pwbd|ex-?servicemen|esm|ews)\b[\s:\-–]*(?:candidates)?[\s:\-–]*(\d{1,2})\s*(?:years?|yrs?)",
    )
    .unwrap()
});

pub fn extract(text: &str) -> AgeInfo {
    let mut info = AgeInfo::default();

    let masked = NUMERIC_DATE_RE.replace_all(text, " ");
    if let Some(caps) = RANGE_RE.captures(&masked) {
        let min = caps[1].parse::<u32>().ok();
        let max = caps[2].parse::<u32>().ok();
        if let (Some(min), Some(max)) = (min, max) {
            if min <= max {
                info.min = Some(min);
                info.max = Some(max);
            }
        }
    }

    info.relaxation = extract_relaxation(text);
    info
}

fn extract_relaxation(text: &str) -> Option<BTreeMap<String, u32>> {
    let caps = RELAXATION_RE.captures(text)?;
    let window = &caps[1];

    let mut map = BTreeMap::new();
    for c in CATEGORY_RE.captures_iter(window) {
        let Ok(years) = c[2].parse::<u32>() else {
            continue;
        };
        map.entry(canonical_category(&c[1])).or_insert(years);
    }

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn canonical_category(raw: &str) -> String {
    let lower: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    match lower.as_str() {
        "sc/st" => "SC/ST".to_string(),
        "pwd" | "pwbd" => "PwD".to_string(),
        "exservicemen" | "ex-servicemen" | "esm" => "Ex-Servicemen".to_string(),
        other => other.to_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_range() {
        let a = extract("Age: 18-32 years. Last Date: 15/04/2024");
        assert_eq!(a.min, Some(18));
        assert_eq!(a.max, Some(32));
        assert_eq!(a.relaxation, None);
    }

    #[test]
    fn to_range_with_label_words() {
        let a = extract("Age Limit (as on 01.01.2024): 21 years to 30 years");
        assert_eq!(a.min, Some(21));
        assert_eq!(a.max, Some(30));
    }

    #[test]
    fn as_on_date_is_not_the_range() {
        for text in [
            "Age Limit (as on 01-08-2024): 18-27 years",
            "Age Limit (as on 01/08/2024): 18-27 years",
            "Age as on 2024-08-01: 18 to 27 years",
        ] {
            let a = extract(text);
            assert_eq!((a.min, a.max), (Some(18), Some(27)), "{text}");
        }
    }

    #[test]
    fn inverted_range_is_absent() {
        let a = extract("Age: 40 - 18");
        assert_eq!(a.min, None);
        assert_eq!(a.max, None);
    }

    #[test]
    fn relaxation_map() {
        let a = extract(
            "Age 18 to 27 years. Age relaxation: OBC 3 years, SC/ST: 5 years, PwBD - 10 years as per rules",
        );
        let r = a.relaxation.unwrap();
        assert_eq!(r.get("OBC"), Some(&3));
        assert_eq!(r.get("SC/ST"), Some(&5));
        assert_eq!(r.get("PwD"), Some(&10));
        assert_eq!(r.len(), 3);
    }

    #[test]
    fn no_age_label() {
        assert_eq!(extract("Vacancies 12-15 posts"), AgeInfo::default());
    }
}
