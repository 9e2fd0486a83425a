use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{rank_candidates, JobStore, SimilarCandidate, StoredJob};
use crate::dedup::title_similarity;
use crate::error::StoreError;
use crate::types::{JobId, JobStatus, NormalizedRecord};

#[derive(Debug, Clone)]
pub struct MemoryRow {
    pub id: JobId,
    pub record: NormalizedRecord,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub is_active: bool,
    pub status: JobStatus,
}

/// In-process store with the same uniqueness rule as the SQLite schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<MemoryRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Result<Vec<MemoryRow>, StoreError> {
        Ok(self.rows.lock().map_err(|_| StoreError::Poisoned)?.clone())
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn stored(row: &MemoryRow) -> StoredJob {
    StoredJob {
        id: row.id,
        job_title: row.record.job_title.clone(),
        organization_name: row.record.organization_name.clone(),
        content_fingerprint: row.record.content_fingerprint.clone(),
        first_seen_at: row.first_seen_at,
        last_seen_at: row.last_seen_at,
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<StoredJob>, StoreError> {
        let rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(rows
            .iter()
            .filter(|r| r.record.content_fingerprint.as_deref() == Some(fingerprint))
            .map(stored)
            .collect())
    }

    async fn insert(&self, record: &NormalizedRecord) -> Result<JobId, StoreError> {
        let mut rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(fp) = &record.content_fingerprint {
            if rows
                .iter()
                .any(|r| r.record.content_fingerprint.as_ref() == Some(fp))
            {
                return Err(StoreError::DuplicateFingerprint(fp.clone()));
            }
        }
        let id = rows.last().map(|r| r.id + 1).unwrap_or(1);
        rows.push(MemoryRow {
            id,
            record: record.clone(),
            first_seen_at: record.processed_at,
            last_seen_at: record.processed_at,
            is_active: true,
            status: record.status,
        });
        Ok(id)
    }

    async fn mark_merged(&self, id: JobId, observed_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        row.last_seen_at = observed_at;
        Ok(())
    }

    async fn mark_expired(&self, before: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff = before.date_naive();
        let mut rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;
        let mut count = 0;
        for row in rows.iter_mut().filter(|r| r.is_active) {
            if row.record.dates.application_end.is_some_and(|end| end < cutoff) {
                row.is_active = false;
                row.status = JobStatus::Closed;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn find_similar(
        &self,
        title: &str,
        organization: &str,
        threshold: f64,
    ) -> Result<Vec<SimilarCandidate>, StoreError> {
        let rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;
        let candidates = rows
            .iter()
            .filter(|r| r.record.organization_name.eq_ignore_ascii_case(organization))
            .filter_map(|r| {
                let score = title_similarity(title, &r.record.job_title);
                (score >= threshold).then(|| SimilarCandidate {
                    id: r.id,
                    job_title: r.record.job_title.clone(),
                    organization_name: r.record.organization_name.clone(),
                    fingerprint: r.record.content_fingerprint.clone(),
                    score,
                })
            })
            .collect();
        Ok(rank_candidates(candidates))
    }
}
