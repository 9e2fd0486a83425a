use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use job_curator::db::{JobStore, SqliteStore};
use job_curator::dedup::{Decision, Deduplicator};
use job_curator::error::{FetchError, PipelineError};
use job_curator::parser::Normalizer;
use job_curator::pipeline::{Pipeline, RunCounts};
use job_curator::retry::RetryPolicy;
use job_curator::scraper::{FixtureFetcher, Portal};
use job_curator::types::RawRecord;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_pipeline() -> Pipeline<FixtureFetcher, SqliteStore> {
    Pipeline::new(
        FixtureFetcher { dir: fixtures() },
        Arc::new(SqliteStore::open_in_memory().unwrap()),
        Normalizer::default(),
        RetryPolicy::new(3, Duration::from_millis(1)),
    )
    .with_similarity_check(0.6)
}

fn junior_engineer() -> RawRecord {
    RawRecord {
        source: "SSC".into(),
        source_url: "https://ssc.nic.in".into(),
        title: "Junior Engineer".into(),
        organization_name: "Staff Selection Commission".into(),
        organization_type: "Central Government".into(),
        notification_url: None,
        apply_link: None,
        raw_text: "Junior Engineer. Total Vacancies: 1200. Qualification: Diploma. \
                   Age: 18-32 years. Last Date: 15/04/2024"
            .into(),
        date_text: None,
        scraped_at: Utc.with_ymd_and_hms(2024, 3, 28, 9, 0, 0).unwrap(),
        metadata: serde_json::Value::Null,
    }
}

#[tokio::test]
async fn junior_engineer_inserts_then_merges() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let dedup = Deduplicator::new(store.clone());
    let normalizer = Normalizer::default();

    let mut first = normalizer.normalize(&junior_engineer()).unwrap();
    assert_eq!(first.vacancies.total, 1200);
    assert_eq!(first.qualification.min, "Diploma");
    assert_eq!(first.age.min, Some(18));
    assert_eq!(first.age.max, Some(32));
    assert_eq!(first.dates.application_end, NaiveDate::from_ymd_opt(2024, 4, 15));

    assert_eq!(dedup.resolve(&mut first).await.unwrap(), Decision::Insert);
    let id = store.insert(&first).await.unwrap();

    let mut again = normalizer.normalize(&junior_engineer()).unwrap();
    assert_eq!(dedup.resolve(&mut again).await.unwrap(), Decision::MergeInto(id));
    assert_eq!(again.content_fingerprint, first.content_fingerprint);
}

#[tokio::test]
async fn fixture_batch_isolates_bad_record_and_dedupes_on_rerun() {
    let pipeline = fixture_pipeline();

    let first = pipeline.run_one(Portal::Ssc).await.unwrap();
    assert_eq!(
        first,
        RunCounts {
            inserted: 2,
            duplicates: 0,
            failed: 1
        }
    );

    let second = pipeline.run_one(Portal::Ssc).await.unwrap();
    assert_eq!(
        second,
        RunCounts {
            inserted: 0,
            duplicates: 2,
            failed: 1
        }
    );

    let stats = pipeline.store().stats().unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.active, 2);
}

#[tokio::test]
async fn overview_reads_back_stored_fields() {
    let pipeline = fixture_pipeline();
    pipeline.run_one(Portal::Ssc).await.unwrap();

    let rows = pipeline.store().overview(None, Some("SSC"), 10).unwrap();
    assert_eq!(rows.len(), 2);
    let je = rows
        .iter()
        .find(|r| r.job_title.starts_with("Junior Engineer"))
        .unwrap();
    assert_eq!(je.total_vacancies, 1200);
    assert_eq!(je.application_end, NaiveDate::from_ymd_opt(2024, 4, 15));
}

#[tokio::test]
async fn missing_fixture_fails_only_that_portal() {
    let pipeline = fixture_pipeline();
    let runs = pipeline.run_all(&[Portal::Upsc, Portal::Ssc]).await;

    // Fixture I/O errors are permanent: reported as a failure, never retried.
    match &runs[0].result {
        Err(PipelineError::FetchFailed { portal, last }) => {
            assert_eq!(*portal, Portal::Upsc);
            assert!(matches!(last, FetchError::FixtureIo { .. }));
        }
        other => panic!("expected fetch failure, got {other:?}"),
    }
    assert_eq!(runs[0].result.as_ref().unwrap_err().portal(), Portal::Upsc);
    assert_eq!(runs[1].result.as_ref().unwrap().inserted, 2);
}

#[tokio::test]
async fn expiry_after_run_closes_past_postings() {
    let pipeline = fixture_pipeline();
    pipeline.run_one(Portal::Ssc).await.unwrap();

    let store = pipeline.store();
    let mid = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    assert_eq!(store.mark_expired(mid).await.unwrap(), 1);

    let later = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(store.mark_expired(later).await.unwrap(), 1);

    let stats = store.stats().unwrap();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.by_status, vec![("closed".to_string(), 2)]);
}
