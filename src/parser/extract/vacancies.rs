use std::sync::LazyLock;

use regex::Regex;

use crate::parser::text::parse_grouped;
use crate::types::VacancyInfo;

static COUNT_BEFORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:,\d{2,3})+|\d+)\s*(?:posts?|vacanc(?:y|ies))\b").unwrap()
});
static COUNT_AFTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:total\s+)?(?:vacanc(?:y|ies)|no\.?\s*of\s*(?:posts?|vacanc(?:y|ies))|posts?)\s*[:\-–]\s*(\d{1,3}(?:,\d{2,3})+|\d+)\b",
    )
    .unwrap()
});
static BREAKDOWN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(UR|GEN|General|OBC|SC|ST|EWS|PwBD|PwD)\s*[-:–]\s*(\d{1,5})\b").unwrap()
});

/// Vacancy count defaults to 1; a parsed zero is treated as absent.
pub fn extract(text: &str) -> VacancyInfo {
    let total = COUNT_BEFORE_RE
        .captures(text)
        .or_else(|| COUNT_AFTER_RE.captures(text))
        .and_then(|c| parse_grouped::<u32>(&c[1]))
        .filter(|n| *n >= 1)
        .unwrap_or(1);

    let parts: Vec<String> = BREAKDOWN_RE
        .captures_iter(text)
        .map(|c| format!("{}-{}", &c[1], &c[2]))
        .collect();

    VacancyInfo {
        total,
        post_category_breakdown: if parts.len() >= 2 {
            Some(parts.join(", "))
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_before_keyword() {
        assert_eq!(extract("Recruitment of 250 Posts of Constable").total, 250);
        assert_eq!(extract("1 vacancy for Driver").total, 1);
    }

    #[test]
    fn label_then_count() {
        assert_eq!(extract("Junior Engineer. Total Vacancies: 1200. Qualification: Diploma").total, 1200);
        assert_eq!(extract("No. of Posts: 35").total, 35);
    }

    #[test]
    fn grouped_count() {
        assert_eq!(extract("Notice for 1,500 vacancies").total, 1500);
    }

    #[test]
    fn defaults_to_one() {
        assert_eq!(extract("Assistant Section Officer").total, 1);
        assert_eq!(extract("0 posts").total, 1);
        assert_eq!(extract("99999999999 posts").total, 1);
    }

    #[test]
    fn breakdown_collected() {
        let v = extract("Total Vacancies: 500 (UR-200, OBC-135, SC-75, ST-40, EWS-50)");
        assert_eq!(v.total, 500);
        assert_eq!(
            v.post_category_breakdown.as_deref(),
            Some("UR-200, OBC-135, SC-75, ST-40, EWS-50")
        );
    }
}
