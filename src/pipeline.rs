use std::sync::Arc;

use chrono::Utc;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::db::JobStore;
use crate::dedup::{Decision, Deduplicator};
use crate::error::{FetchError, NormalizeError, PipelineError, RecordError, StoreError};
use crate::parser::Normalizer;
use crate::retry::{retry, RetryPolicy};
use crate::scraper::{Fetch, Portal};
use crate::types::{JobId, NormalizedRecord, RawRecord};

/// Aggregate outcome of one portal's batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct PortalRun {
    pub portal: Portal,
    pub result: Result<RunCounts, PipelineError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Inserted(JobId),
    Merged(JobId),
}

/// Fetch → normalize → dedupe → store, one portal at a time.
pub struct Pipeline<F: Fetch, S: JobStore> {
    fetcher: F,
    store: Arc<S>,
    dedup: Deduplicator<S>,
    normalizer: Normalizer,
    retry: RetryPolicy,
    similarity_threshold: Option<f64>,
}

impl<F: Fetch, S: JobStore> Pipeline<F, S> {
    pub fn new(fetcher: F, store: Arc<S>, normalizer: Normalizer, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            dedup: Deduplicator::new(store.clone()),
            store,
            normalizer,
            retry,
            similarity_threshold: None,
        }
    }

    /// Log near-duplicate candidates at or above `threshold` before inserts.
    pub fn with_similarity_check(mut self, threshold: f64) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run every portal in order. A portal whose fetch is exhausted is
    /// reported and the next one still runs.
    pub async fn run_all(&self, portals: &[Portal]) -> Vec<PortalRun> {
        let mut runs = Vec::with_capacity(portals.len());
        for &portal in portals {
            let result = self.run_one(portal).await;
            if let Err(e) = &result {
                error!(portal = %portal, "portal run failed: {}", e);
            }
            runs.push(PortalRun { portal, result });
        }
        runs
    }

    /// Only a fetch that stays failed after every retry is an error here;
    /// per-record failures are counted in [`RunCounts::failed`].
    pub async fn run_one(&self, portal: Portal) -> Result<RunCounts, PipelineError> {
        let label = format!("fetch {}", portal);
        let records = retry(&self.retry, &label, FetchError::is_transient, || {
            self.fetcher.fetch(portal)
        })
        .await
        .map_err(|exhausted| {
            error!(
                portal = %portal,
                attempts = exhausted.attempts,
                "fetch gave up: {}",
                exhausted.last
            );
            if exhausted.last.is_transient() {
                PipelineError::FetchExhausted {
                    portal,
                    attempts: exhausted.attempts,
                    last: exhausted.last,
                }
            } else {
                PipelineError::FetchFailed {
                    portal,
                    last: exhausted.last,
                }
            }
        })?;

        info!(portal = %portal, fetched = records.len(), "fetched announcements");
        let counts = self.process(portal, &records).await;
        info!(
            portal = %portal,
            inserted = counts.inserted,
            duplicates = counts.duplicates,
            failed = counts.failed,
            "portal run complete"
        );
        Ok(counts)
    }

    /// Normalize the whole batch in parallel, then resolve and store each
    /// record sequentially in fetch order.
    pub async fn process(&self, portal: Portal, records: &[RawRecord]) -> RunCounts {
        let processed_at = Utc::now();
        let normalized: Vec<Result<NormalizedRecord, NormalizeError>> = records
            .par_iter()
            .map(|raw| self.normalizer.normalize_at(raw, processed_at))
            .collect();

        let mut counts = RunCounts::default();
        for (raw, result) in records.iter().zip(normalized) {
            match self.store_one(result).await {
                Ok(Outcome::Inserted(id)) => {
                    info!(portal = %portal, id, title = %raw.title, "inserted");
                    counts.inserted += 1;
                }
                Ok(Outcome::Merged(id)) => {
                    debug!(portal = %portal, id, title = %raw.title, "merged duplicate");
                    counts.duplicates += 1;
                }
                Err(e) => {
                    error!(portal = %portal, title = %raw.title, "record failed: {}", e);
                    counts.failed += 1;
                }
            }
        }
        counts
    }

    async fn store_one(
        &self,
        normalized: Result<NormalizedRecord, NormalizeError>,
    ) -> Result<Outcome, RecordError> {
        let mut record = normalized?;

        if let Decision::MergeInto(id) = self.dedup.resolve(&mut record).await? {
            self.store.mark_merged(id, record.processed_at).await?;
            return Ok(Outcome::Merged(id));
        }

        if let Some(threshold) = self.similarity_threshold {
            self.log_similar(&record, threshold).await;
        }

        match self.store.insert(&record).await {
            Ok(id) => Ok(Outcome::Inserted(id)),
            Err(StoreError::DuplicateFingerprint(fp)) => {
                warn!(fingerprint = %fp, "fingerprint stored concurrently, re-resolving");
                match self.dedup.resolve(&mut record).await? {
                    Decision::MergeInto(id) => {
                        self.store.mark_merged(id, record.processed_at).await?;
                        Ok(Outcome::Merged(id))
                    }
                    Decision::Insert => Err(StoreError::DuplicateFingerprint(fp).into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Advisory only: a lookup failure is logged and never fails the record.
    async fn log_similar(&self, record: &NormalizedRecord, threshold: f64) {
        match self.dedup.similar(record, threshold).await {
            Ok(candidates) => {
                for c in candidates {
                    info!(
                        title = %record.job_title,
                        candidate_id = c.id,
                        candidate_title = %c.job_title,
                        score = c.score,
                        "possible near-duplicate"
                    );
                }
            }
            Err(e) => warn!(title = %record.job_title, "similarity lookup failed: {}", e),
        }
    }
}

// ── Tests ──
