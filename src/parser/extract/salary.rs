use std::sync::LazyLock;

use regex::Regex;

use crate::parser::text::parse_grouped;
use crate::types::SalaryInfo;

/// An amount of at least four digits, with optional digit grouping. Never
/// starts with a zero, so clock times like "0900" are not amounts.
const AMOUNT: &str = r"([1-9]\d{0,2}(?:,\d{2,3})+|[1-9]\d{3,})";
/// Rupee marker; `rs` must start a word so "hours"/"numbers" don't count.
const CURRENCY: &str = r"(?:\brs\.?|\binr|₹)";

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:{CURRENCY}\s*|\b(?:pay\s*scale|pay\s*band|salary|pay|stipend|emoluments?)\b[\s:\-]*{CURRENCY}?\s*){AMOUNT}\s*(?:-|–|to)\s*{CURRENCY}?\s*{AMOUNT}"
    ))
    .unwrap()
});
static BARE_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b{AMOUNT}\s*(?:-|–)\s*{AMOUNT}\b")).unwrap());
static SINGLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:salary|pay)\b[^\d]{{0,30}}?{CURRENCY}?\s*{AMOUNT}"
    ))
    .unwrap()
});
static LEVEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:pay\s*)?level\s*[-:]?\s*(\d{1,2})\b").unwrap());

pub fn extract(text: &str) -> SalaryInfo {
    let mut info = SalaryInfo {
        pay_level: LEVEL_RE
            .captures(text)
            .map(|c| format!("Level-{}", &c[1])),
        ..Default::default()
    };

    let range = RANGE_RE
        .captures(text)
        .or_else(|| BARE_RANGE_RE.captures(text));
    if let Some(caps) = range {
        let min = parse_grouped::<u64>(&caps[1]);
        let max = parse_grouped::<u64>(&caps[2]);
        if let (Some(min), Some(max)) = (min, max) {
            info.min = Some(min.min(max));
            info.max = Some(min.max(max));
            return info;
        }
    }

    info.min = SINGLE_RE
        .captures(text)
        .and_then(|c| parse_grouped::<u64>(&c[1]));
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pay_scale_with_level() {
        let s = extract("Pay Scale Rs. 9300-34800, Level-7");
        assert_eq!(s.min, Some(9300));
        assert_eq!(s.max, Some(34800));
        assert_eq!(s.pay_level.as_deref(), Some("Level-7"));
    }

    #[test]
    fn grouped_amounts_with_rupee_sign() {
        let s = extract("Salary: ₹44,900 to ₹1,42,400 per month (Pay Level 7)");
        assert_eq!(s.min, Some(44900));
        assert_eq!(s.max, Some(142400));
        assert_eq!(s.pay_level.as_deref(), Some("Level-7"));
    }

    #[test]
    fn bare_range_fallback() {
        let s = extract("Emolument band 25000 - 81100 as per norms");
        assert_eq!(s.min, Some(25000));
        assert_eq!(s.max, Some(81100));
        assert_eq!(s.pay_level, None);
    }

    #[test]
    fn explicit_range_wins_over_earlier_bare_range() {
        let s = extract("Roll numbers 10001-19999. Pay: Rs 35400-112400");
        assert_eq!(s.min, Some(35400));
        assert_eq!(s.max, Some(112400));
    }

    #[test]
    fn words_ending_in_rs_are_not_currency() {
        assert_eq!(extract("Working hours 0900-1700 daily"), SalaryInfo::default());

        let s = extract("Working hours 0900-1700. Salary Rs. 25,500 - 81,100");
        assert_eq!(s.min, Some(25500));
        assert_eq!(s.max, Some(81100));
    }

    #[test]
    fn single_amount_sets_min_only() {
        let s = extract("Consolidated pay of Rs. 25,000 per month");
        assert_eq!(s.min, Some(25000));
        assert_eq!(s.max, None);
    }

    #[test]
    fn short_numbers_are_not_salary() {
        let s = extract("Age 18-27 years, 120 posts");
        assert_eq!(s, SalaryInfo::default());
    }
}
