use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Unprocessed scrape output for one announcement. Never mutated after the
/// fetch step hands it over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub source: String,
    pub source_url: String,
    pub title: String,
    pub organization_name: String,
    pub organization_type: String,
    #[serde(default)]
    pub notification_url: Option<String>,
    #[serde(default)]
    pub apply_link: Option<String>,
    pub raw_text: String,
    #[serde(default)]
    pub date_text: Option<String>,
    pub scraped_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmploymentType {
    #[default]
    Permanent,
    Contract,
    Temporary,
    Internship,
    Apprenticeship,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permanent => "Permanent",
            Self::Contract => "Contract",
            Self::Temporary => "Temporary",
            Self::Internship => "Internship",
            Self::Apprenticeship => "Apprenticeship",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionLevel {
    Director,
    Manager,
    Officer,
    Assistant,
    Clerk,
    #[default]
    Other,
}

impl PositionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Director => "Director",
            Self::Manager => "Manager",
            Self::Officer => "Officer",
            Self::Assistant => "Assistant",
            Self::Clerk => "Clerk",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApplicationMode {
    #[default]
    Online,
    Offline,
    Both,
}

impl ApplicationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
            Self::Both => "Both",
        }
    }
}

/// Review state of a stored posting. Records always start as `PendingReview`;
/// later transitions belong to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Draft,
    #[default]
    PendingReview,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "active" => Ok(Self::Active),
            "draft" => Ok(Self::Draft),
            "pending_review" | "pending" => Ok(Self::PendingReview),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyInfo {
    pub total: u32,
    pub post_category_breakdown: Option<String>,
}

impl Default for VacancyInfo {
    fn default() -> Self {
        Self {
            total: 1,
            post_category_breakdown: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocationInfo {
    pub states: Vec<String>,
    pub cities: Vec<String>,
    pub is_all_india: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationInfo {
    pub required: Vec<String>,
    pub min: String,
    pub max: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgeInfo {
    pub min: Option<u32>,
    pub max: Option<u32>,
    /// Category → years of relaxation.
    pub relaxation: Option<BTreeMap<String, u32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SalaryInfo {
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub pay_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeInfo {
    pub general: Option<u32>,
    pub obc: Option<u32>,
    pub sc_st: Option<u32>,
    pub pwd: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub mode: ApplicationMode,
    pub fees: FeeInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateInfo {
    pub notification: Option<NaiveDate>,
    pub application_start: Option<NaiveDate>,
    pub application_end: Option<NaiveDate>,
    pub exam: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextSections {
    pub job_description: Option<String>,
    pub selection_process: Option<String>,
    pub exam_pattern: Option<String>,
    pub important_instructions: Option<String>,
    pub required_skills: Option<String>,
    pub job_benefits: Option<String>,
}

/// Structured, schema-conformant extraction result for one RawRecord.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub job_title: String,
    pub organization_name: String,
    pub organization_type: String,
    pub notification_url: Option<String>,
    pub apply_link: Option<String>,

    pub vacancies: VacancyInfo,
    pub employment_type: EmploymentType,
    pub position_level: PositionLevel,
    pub location: LocationInfo,
    pub qualification: QualificationInfo,
    pub age: AgeInfo,
    pub salary: SalaryInfo,
    pub application: ApplicationInfo,
    pub dates: DateInfo,
    pub sections: TextSections,

    pub source: String,
    pub source_url: String,
    pub scraped_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    pub status: JobStatus,

    /// Set by the deduplicator, never by the normalizer.
    pub content_fingerprint: Option<String>,
}

/// Store-assigned row identifier.
pub type JobId = i64;
