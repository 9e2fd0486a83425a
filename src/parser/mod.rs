pub mod extract;
pub mod text;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::NormalizeError;
use crate::types::{JobStatus, NormalizedRecord, RawRecord};
use extract::dates;

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub title_max_len: usize,
    pub section_window: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            title_max_len: 200,
            section_window: 500,
        }
    }
}

/// Stateless: clean → extract → assemble. Safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    pub fn normalize(&self, raw: &RawRecord) -> Result<NormalizedRecord, NormalizeError> {
        self.normalize_at(raw, Utc::now())
    }

    /// Same as [`normalize`](Self::normalize) with an explicit `processed_at`.
    pub fn normalize_at(
        &self,
        raw: &RawRecord,
        processed_at: DateTime<Utc>,
    ) -> Result<NormalizedRecord, NormalizeError> {
        let job_title = text::truncate(&text::clean(&raw.title), self.options.title_max_len);
        if job_title.is_empty() {
            return Err(NormalizeError::MissingField("title"));
        }
        let organization_name = text::clean(&raw.organization_name);
        if organization_name.is_empty() {
            return Err(NormalizeError::MissingField("organization name"));
        }
        debug!(title = %job_title, source = %raw.source, "normalizing");

        let body = text::clean(&raw.raw_text);
        let mut fields = extract::extract_all(&body, self.options.section_window);

        if fields.dates.notification.is_none() {
            fields.dates.notification = raw.date_text.as_deref().and_then(dates::parse_date);
        }

        Ok(NormalizedRecord {
            position_level: extract::employment::position_level(&job_title),
            job_title,
            organization_name,
            organization_type: text::clean(&raw.organization_type),
            notification_url: raw.notification_url.clone(),
            apply_link: raw.apply_link.clone(),
            vacancies: fields.vacancies,
            employment_type: fields.employment_type,
            location: fields.location,
            qualification: fields.qualification,
            age: fields.age,
            salary: fields.salary,
            application: fields.application,
            dates: fields.dates,
            sections: fields.sections,
            source: raw.source.clone(),
            source_url: raw.source_url.clone(),
            scraped_at: raw.scraped_at,
            processed_at,
            status: JobStatus::PendingReview,
            content_fingerprint: None,
        })
    }
}

// ── Tests ──
