pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StoreError;
use crate::types::{JobId, NormalizedRecord};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Upper bound on advisory near-duplicate candidates.
pub const MAX_SIMILAR: usize = 10;

/// Identity columns of a stored posting.
#[derive(Debug, Clone)]
pub struct StoredJob {
    pub id: JobId,
    pub job_title: String,
    pub organization_name: String,
    pub content_fingerprint: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarCandidate {
    pub id: JobId,
    pub job_title: String,
    pub organization_name: String,
    pub fingerprint: Option<String>,
    pub score: f64,
}

/// Persistence boundary the pipeline writes through. Every call may suspend;
/// failures come back as ordinary errors.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Exact-match lookup. Implementations return every row carrying the
    /// fingerprint so the caller can detect a broken uniqueness invariant.
    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<StoredJob>, StoreError>;

    /// Fails with [`StoreError::DuplicateFingerprint`] if the fingerprint is
    /// already present.
    async fn insert(&self, record: &NormalizedRecord) -> Result<JobId, StoreError>;

    /// Bump the "last observed" timestamp. Content fields are left as first seen.
    /// Fails with [`StoreError::NotFound`] for an unknown id.
    async fn mark_merged(&self, id: JobId, observed_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Close active postings whose application end date is before `before`.
    async fn mark_expired(&self, before: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Ranked near-duplicates from the same organization. Optional capability.
    async fn find_similar(
        &self,
        _title: &str,
        _organization: &str,
        _threshold: f64,
    ) -> Result<Vec<SimilarCandidate>, StoreError> {
        Ok(Vec::new())
    }
}

/// Sort best-first and cap at [`MAX_SIMILAR`].
pub(crate) fn rank_candidates(mut candidates: Vec<SimilarCandidate>) -> Vec<SimilarCandidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
    candidates.truncate(MAX_SIMILAR);
    candidates
}
