use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::parser::extract::qualification::NOT_SPECIFIED;
use crate::parser::text::truncate;
use crate::types::NormalizedRecord;

pub const SLUG_MAX_LEN: usize = 100;
pub const META_DESCRIPTION_MAX_LEN: usize = 160;

static NON_ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lowercase, runs of anything outside `[a-z0-9]` collapsed to one `-`.
pub fn slug(title: &str, organization: &str) -> String {
    let lower = format!("{title} {organization}").to_lowercase();
    let dashed = NON_ALNUM_RE.replace_all(&lower, "-");
    let cut: String = dashed.trim_matches('-').chars().take(SLUG_MAX_LEN).collect();
    cut.trim_end_matches('-').to_string()
}

pub fn meta_title(record: &NormalizedRecord) -> String {
    format!("{} - {}", record.job_title, record.organization_name)
}

pub fn meta_description(record: &NormalizedRecord) -> String {
    let mut parts = vec![format!(
        "{} vacancies for {} in {}.",
        record.vacancies.total, record.job_title, record.organization_name
    )];
    if record.qualification.min != NOT_SPECIFIED {
        parts.push(format!("Qualification: {}.", record.qualification.min));
    }
    if let Some(end) = record.dates.application_end {
        parts.push(format!("Apply before {}.", end.format("%d %b %Y")));
    }
    truncate(&parts.join(" "), META_DESCRIPTION_MAX_LEN)
}

/// schema.org `JobPosting` document.
pub fn job_posting(record: &NormalizedRecord) -> Value {
    let description = record.sections.job_description.clone().unwrap_or_else(|| {
        format!(
            "{} vacancies for {} in {}",
            record.vacancies.total, record.job_title, record.organization_name
        )
    });
    let date_posted = match record.dates.notification {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => record.scraped_at.to_rfc3339(),
    };

    let mut doc = json!({
        "@context": "https://schema.org",
        "@type": "JobPosting",
        "title": record.job_title,
        "description": description,
        "hiringOrganization": {
            "@type": "Organization",
            "name": record.organization_name,
        },
        "datePosted": date_posted,
        "employmentType": record.employment_type.as_str().to_uppercase(),
        "jobLocation": {
            "@type": "Place",
            "address": {
                "@type": "PostalAddress",
                "addressCountry": "IN",
            },
        },
    });

    if let Some(end) = record.dates.application_end {
        doc["validThrough"] = json!(end.format("%Y-%m-%d").to_string());
    }
    if record.salary.min.is_some() || record.salary.max.is_some() {
        doc["baseSalary"] = json!({
            "@type": "MonetaryAmount",
            "currency": "INR",
            "value": {
                "@type": "QuantitativeValue",
                "minValue": record.salary.min,
                "maxValue": record.salary.max,
                "unitText": "MONTH",
            },
        });
    }
    if record.qualification.min != NOT_SPECIFIED {
        doc["educationRequirements"] = json!({
            "@type": "EducationalOccupationalCredential",
            "credentialCategory": record.qualification.min,
        });
    }
    doc
}
