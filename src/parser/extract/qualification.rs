use std::sync::LazyLock;

use regex::Regex;

use crate::types::QualificationInfo;

pub const NOT_SPECIFIED: &str = "Not Specified";

struct Tier {
    rank: u8,
    name: &'static str,
    keywords: &'static [&'static str],
}

/// Ordinal ranking of qualification tiers, lowest first.
const TIERS: &[Tier] = &[
    Tier {
        rank: 1,
        name: "10th Pass",
        keywords: &["10th", "class 10", "class x", "matric", "matriculation", "high school"],
    },
    Tier {
        rank: 2,
        name: "12th Pass",
        keywords: &["12th", "class 12", "class xii", "intermediate", "higher secondary", "hsc", "10+2"],
    },
    Tier {
        rank: 3,
        name: "Diploma",
        keywords: &["diploma", "iti", "polytechnic"],
    },
    Tier {
        rank: 4,
        name: "Graduation",
        keywords: &[
            "graduation", "graduate", "bachelor", "bachelor's", "degree", "b.a", "b.sc", "b.com",
            "b.tech", "b.e", "bca", "bba", "llb", "mbbs",
        ],
    },
    Tier {
        rank: 5,
        name: "Post Graduation",
        keywords: &[
            "post graduation", "post graduate", "postgraduate", "master", "master's", "pg", "m.a",
            "m.sc", "m.com", "m.tech", "mba", "mca",
        ],
    },
    Tier {
        rank: 6,
        name: "PhD",
        keywords: &["phd", "ph.d", "doctorate", "doctoral"],
    },
];

static TIER_RES: LazyLock<Vec<(&'static Tier, Regex)>> = LazyLock::new(|| {
    TIERS
        .iter()
        .map(|tier| {
            let alternatives: Vec<String> = tier
                .keywords
                .iter()
                .map(|k| keyword_pattern(k))
                .collect();
            let pattern = format!(r"(?i)(?:{})", alternatives.join("|"));
            (tier, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// "10th March" is a date, not a 10th-pass requirement.
static ORDINAL_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d{1,2}(?:st|nd|rd|th)\s+(?:of\s+)?(?:(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|june?|july?|aug(?:ust)?|sep(?:t|tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b\.?|may,?\s+\d{4})",
    )
    .unwrap()
});

/// Word-bounded where the keyword edge is a word character; keywords like
/// "10+2" end on punctuation and cannot use `\b` there.
fn keyword_pattern(keyword: &str) -> String {
    let escaped = regex::escape(keyword).replace(' ', r"\s+");
    let starts_word = keyword.chars().next().is_some_and(|c| c.is_alphanumeric());
    let ends_word = keyword.chars().last().is_some_and(|c| c.is_alphanumeric());
    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        escaped,
        if ends_word { r"\b" } else { "" }
    )
}

pub fn extract(text: &str) -> QualificationInfo {
    let text = ORDINAL_DATE_RE.replace_all(text, " ");
    // TIERS is already in rank order, so filtering keeps the ascending sort.
    let found: Vec<&Tier> = TIER_RES
        .iter()
        .filter(|(_, re)| re.is_match(&text))
        .map(|(tier, _)| *tier)
        .collect();

    let min = found
        .iter()
        .min_by_key(|t| t.rank)
        .map(|t| t.name.to_string())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string());
    let max = if found.len() > 1 {
        found.iter().max_by_key(|t| t.rank).map(|t| t.name.to_string())
    } else {
        None
    };

    QualificationInfo {
        required: found.iter().map(|t| t.name.to_string()).collect(),
        min,
        max,
    }
}
