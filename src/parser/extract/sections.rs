use std::sync::LazyLock;

use regex::Regex;

use crate::parser::text::truncate;
use crate::types::TextSections;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    JobDescription,
    SelectionProcess,
    ExamPattern,
    ImportantInstructions,
    RequiredSkills,
    JobBenefits,
}

/// Labels per section, tried in order; the first label present wins.
const LABELS: &[(SectionKind, &[&str])] = &[
    (
        SectionKind::JobDescription,
        &["job description", "about the post", "nature of duties", "job profile", "duties"],
    ),
    (
        SectionKind::SelectionProcess,
        &["selection process", "selection procedure", "mode of selection", "scheme of selection"],
    ),
    (
        SectionKind::ExamPattern,
        &["exam pattern", "examination pattern", "scheme of examination", "scheme of exam"],
    ),
    (
        SectionKind::ImportantInstructions,
        &["important instructions", "general instructions", "how to apply", "instructions"],
    ),
    (
        SectionKind::RequiredSkills,
        &["required skills", "skills required", "desirable qualification", "desirable"],
    ),
    (
        SectionKind::JobBenefits,
        &["benefits", "perks", "allowances"],
    ),
];

static LABEL_RES: LazyLock<Vec<(SectionKind, Vec<Regex>)>> = LazyLock::new(|| {
    LABELS
        .iter()
        .map(|(kind, labels)| {
            let res = labels
                .iter()
                .map(|l| {
                    let pattern = format!(
                        r"(?i)\b{}\b\s*[:\-–]?\s*",
                        regex::escape(l).replace(' ', r"\s+")
                    );
                    Regex::new(&pattern).unwrap()
                })
                .collect();
            (*kind, res)
        })
        .collect()
});

/// Text following the first matching label, cut to `window` chars.
pub fn extract(text: &str, window: usize) -> TextSections {
    let mut out = TextSections::default();
    for (kind, res) in LABEL_RES.iter() {
        let found = res.iter().find_map(|re| {
            let m = re.find(text)?;
            let body = truncate(&text[m.end()..], window);
            let body = body.trim();
            (!body.is_empty()).then(|| body.to_string())
        });
        let slot = match kind {
            SectionKind::JobDescription => &mut out.job_description,
            SectionKind::SelectionProcess => &mut out.selection_process,
            SectionKind::ExamPattern => &mut out.exam_pattern,
            SectionKind::ImportantInstructions => &mut out.important_instructions,
            SectionKind::RequiredSkills => &mut out.required_skills,
            SectionKind::JobBenefits => &mut out.job_benefits,
        };
        *slot = found;
    }
    out
}
