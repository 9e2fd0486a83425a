use std::sync::LazyLock;

use regex::Regex;

use crate::parser::text::parse_grouped;
use crate::types::FeeInfo;

fn category_fee(keywords: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)\b(?:{keywords})\b[^.;]{{0,30}}?(?:\bfees?\b[^\d.;]{{0,15}}?(?:(?:\brs\.?|\binr|₹)\s*(\d[\d,]*)|\b(nil|exempted|exempt|no fee)\b)|\b(no\s+fees?|nil|exempted|exempt)\b)"
    ))
    .unwrap()
}

static GENERAL_RE: LazyLock<Regex> = LazyLock::new(|| category_fee(r"general|gen|ur|unreserved"));
static OBC_RE: LazyLock<Regex> = LazyLock::new(|| category_fee(r"obc"));
static SC_ST_RE: LazyLock<Regex> = LazyLock::new(|| category_fee(r"sc\s*/\s*st|sc|st"));
static PWD_RE: LazyLock<Regex> = LazyLock::new(|| category_fee(r"pwd|pwbd|ph"));

pub fn extract(text: &str) -> FeeInfo {
    FeeInfo {
        general: find(&GENERAL_RE, text),
        obc: find(&OBC_RE, text),
        sc_st: find(&SC_ST_RE, text),
        pwd: find(&PWD_RE, text),
    }
}

/// "Nil" / "exempted" / "no fee" read as a zero fee, whether they follow the
/// "fee" keyword or stand in for it.
fn find(re: &Regex, text: &str) -> Option<u32> {
    let caps = re.captures(text)?;
    match (caps.get(1), caps.get(2).or(caps.get(3))) {
        (Some(amount), _) => parse_grouped(amount.as_str()),
        (None, Some(_)) => Some(0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_category_amounts() {
        let f = extract(
            "General fee: Rs. 100; OBC fee Rs 100; SC/ST fee: Nil; PwD fee exempted",
        );
        assert_eq!(f.general, Some(100));
        assert_eq!(f.obc, Some(100));
        assert_eq!(f.sc_st, Some(0));
        assert_eq!(f.pwd, Some(0));
    }

    #[test]
    fn rupee_symbol_and_grouping() {
        let f = extract("UR candidates application fee ₹1,000 only");
        assert_eq!(f.general, Some(1000));
        assert_eq!(f.obc, None);
    }

    #[test]
    fn no_fee_before_keyword() {
        let f = extract("Application fee: General/OBC Rs. 100. SC/ST/PwD/Women: No fee");
        assert_eq!(f.sc_st, Some(0));
        assert_eq!(f.pwd, Some(0));
    }

    #[test]
    fn words_ending_in_rs_are_not_currency() {
        let f = extract("OBC fee for others 250");
        assert_eq!(f.obc, None);
    }

    #[test]
    fn unlabelled_amounts_are_ignored() {
        assert_eq!(extract("Fee Rs. 500 for all"), FeeInfo::default());
    }
}
