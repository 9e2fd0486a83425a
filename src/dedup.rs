use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use tracing::{debug, error};

use crate::db::{JobStore, SimilarCandidate};
use crate::error::StoreError;
use crate::types::{JobId, NormalizedRecord};

/// Outcome of resolving a record's fingerprint against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Insert,
    MergeInto(JobId),
}

/// SHA-256 over `(job_title, organization_name, application_end_date, total_vacancies)`.
pub fn fingerprint(record: &NormalizedRecord) -> String {
    fingerprint_parts(
        &record.job_title,
        &record.organization_name,
        record.dates.application_end,
        record.vacancies.total,
    )
}

/// Each field is length-prefixed so no choice of separator characters inside
/// a title can make two different tuples hash the same input.
pub fn fingerprint_parts(
    title: &str,
    organization: &str,
    end_date: Option<NaiveDate>,
    vacancies: u32,
) -> String {
    let end = end_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let vacancies = vacancies.to_string();

    let mut hasher = Sha256::new();
    for field in [title, organization, end.as_str(), vacancies.as_str()] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Token Jaccard similarity of two titles, in [0, 1].
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    inter / union
}

fn tokens(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

pub struct Deduplicator<S: JobStore + ?Sized> {
    store: Arc<S>,
}

impl<S: JobStore + ?Sized> Deduplicator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Stamp the record's fingerprint and look it up. Zero matches → Insert,
    /// one → MergeInto; more than one is a store invariant violation.
    pub async fn resolve(&self, record: &mut NormalizedRecord) -> Result<Decision, StoreError> {
        let fp = match &record.content_fingerprint {
            Some(fp) => fp.clone(),
            None => {
                let fp = fingerprint(record);
                record.content_fingerprint = Some(fp.clone());
                fp
            }
        };

        let matches = self.store.find_by_fingerprint(&fp).await?;
        match matches.as_slice() {
            [] => {
                debug!(fingerprint = %fp, "no stored match");
                Ok(Decision::Insert)
            }
            [existing] => Ok(Decision::MergeInto(existing.id)),
            many => {
                error!(
                    fingerprint = %fp,
                    count = many.len(),
                    ids = ?many.iter().map(|m| m.id).collect::<Vec<_>>(),
                    "fingerprint lookup returned more than one record"
                );
                Err(StoreError::MultipleMatches {
                    fingerprint: fp,
                    count: many.len(),
                })
            }
        }
    }

    /// Advisory near-duplicate lookup. Callers log these; nothing is merged.
    pub async fn similar(
        &self,
        record: &NormalizedRecord,
        threshold: f64,
    ) -> Result<Vec<SimilarCandidate>, StoreError> {
        let mut candidates = self
            .store
            .find_similar(&record.job_title, &record.organization_name, threshold)
            .await?;
        if let Some(fp) = &record.content_fingerprint {
            candidates.retain(|c| c.fingerprint.as_deref() != Some(fp.as_str()));
        }
        Ok(candidates)
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::StoredJob;
    use crate::parser::Normalizer;
    use crate::types::RawRecord;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    fn record(title: &str, body: &str) -> NormalizedRecord {
        let raw = RawRecord {
            source: "UPSC".into(),
            source_url: "https://upsc.gov.in".into(),
            title: title.into(),
            organization_name: "Union Public Service Commission".into(),
            organization_type: "Central Government".into(),
            notification_url: None,
            apply_link: None,
            raw_text: body.into(),
            date_text: None,
            scraped_at: Utc::now(),
            metadata: serde_json::Value::Null,
        };
        Normalizer::default().normalize(&raw).unwrap()
    }

    #[test]
    fn fingerprint_is_pure_over_identity_fields() {
        let a = record("Assistant Engineer", "20 posts. Last date: 01/05/2024. Online");
        let b = record("Assistant Engineer", "20 posts. Last date: 01/05/2024. Offline, Kerala");
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);
    }

    #[test]
    fn any_identity_field_changes_fingerprint() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 1);
        let base = fingerprint_parts("Assistant Engineer", "UPSC", d, 20);
        assert_ne!(base, fingerprint_parts("Assistant Engineer II", "UPSC", d, 20));
        assert_ne!(base, fingerprint_parts("Assistant Engineer", "SSC", d, 20));
        assert_ne!(base, fingerprint_parts("Assistant Engineer", "UPSC", None, 20));
        assert_ne!(
            base,
            fingerprint_parts("Assistant Engineer", "UPSC", NaiveDate::from_ymd_opt(2024, 5, 2), 20)
        );
        assert_ne!(base, fingerprint_parts("Assistant Engineer", "UPSC", d, 21));
    }

    #[test]
    fn field_boundaries_cannot_be_shifted() {
        assert_ne!(
            fingerprint_parts("a|b", "c", None, 1),
            fingerprint_parts("a", "b|c", None, 1)
        );
    }

    #[test]
    fn similarity_scores() {
        assert_eq!(title_similarity("Junior Engineer", "junior engineer"), 1.0);
        assert_eq!(title_similarity("Junior Engineer (Civil)", "Junior Engineer"), 2.0 / 3.0);
        assert_eq!(title_similarity("Driver", "Stenographer"), 0.0);
    }

    #[tokio::test]
    async fn empty_store_always_inserts() {
        let dedup = Deduplicator::new(Arc::new(MemoryStore::new()));
        let mut r = record("Geo-Scientist", "5 posts");
        assert_eq!(dedup.resolve(&mut r).await.unwrap(), Decision::Insert);
        assert_eq!(r.content_fingerprint, Some(fingerprint(&r)));
    }

    #[tokio::test]
    async fn second_resolve_after_insert_merges() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Deduplicator::new(store.clone());

        let mut first = record("Geo-Scientist", "5 posts");
        assert_eq!(dedup.resolve(&mut first).await.unwrap(), Decision::Insert);
        let id = store.insert(&first).await.unwrap();

        let mut again = record("Geo-Scientist", "5 posts");
        assert_eq!(dedup.resolve(&mut again).await.unwrap(), Decision::MergeInto(id));
    }

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl JobStore for BrokenStore {
        async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<StoredJob>, StoreError> {
            let row = |id| StoredJob {
                id,
                job_title: "x".into(),
                organization_name: "y".into(),
                content_fingerprint: Some(fingerprint.to_string()),
                first_seen_at: Utc::now(),
                last_seen_at: Utc::now(),
            };
            Ok(vec![row(1), row(2)])
        }
        async fn insert(&self, _: &NormalizedRecord) -> Result<JobId, StoreError> {
            unreachable!()
        }
        async fn mark_merged(&self, _: JobId, _: DateTime<Utc>) -> Result<(), StoreError> {
            unreachable!()
        }
        async fn mark_expired(&self, _: DateTime<Utc>) -> Result<usize, StoreError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn multiple_matches_surface_as_error() {
        let dedup = Deduplicator::new(Arc::new(BrokenStore));
        let mut r = record("Geo-Scientist", "5 posts");
        let err = dedup.resolve(&mut r).await.unwrap_err();
        assert!(matches!(err, StoreError::MultipleMatches { count: 2, .. }));
    }

    #[tokio::test]
    async fn similar_excludes_exact_match() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Deduplicator::new(store.clone());

        let mut stored = record("Combined Geo-Scientist Examination", "5 posts");
        dedup.resolve(&mut stored).await.unwrap();
        store.insert(&stored).await.unwrap();

        let mut near = record("Combined Geo-Scientist Examination", "7 posts");
        dedup.resolve(&mut near).await.unwrap();
        let found = dedup.similar(&near, 0.6).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].score, 1.0);

        let same = dedup.similar(&stored, 0.6).await.unwrap();
        assert!(same.is_empty());
    }
}
