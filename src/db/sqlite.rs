use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{ffi, named_params, Connection};
use tracing::debug;

use super::{rank_candidates, JobStore, SimilarCandidate, StoredJob};
use crate::dedup::title_similarity;
use crate::error::StoreError;
use crate::seo;
use crate::types::{JobId, JobStatus, NormalizedRecord};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS jobs (
        id                      INTEGER PRIMARY KEY,
        slug                    TEXT NOT NULL,
        job_title               TEXT NOT NULL,
        organization_name       TEXT NOT NULL,
        organization_type       TEXT NOT NULL,
        notification_url        TEXT,
        apply_link              TEXT,

        total_vacancies         INTEGER NOT NULL DEFAULT 1,
        post_category_breakdown TEXT,
        employment_type         TEXT NOT NULL,
        position_level          TEXT NOT NULL,

        states                  TEXT NOT NULL DEFAULT '[]',
        cities                  TEXT NOT NULL DEFAULT '[]',
        is_all_india            BOOLEAN NOT NULL DEFAULT 0,

        qualifications          TEXT NOT NULL DEFAULT '[]',
        min_qualification       TEXT NOT NULL,
        max_qualification       TEXT,

        age_min                 INTEGER,
        age_max                 INTEGER,
        age_relaxation          TEXT,

        salary_min              INTEGER,
        salary_max              INTEGER,
        pay_level               TEXT,

        application_mode        TEXT NOT NULL,
        fee_general             INTEGER,
        fee_obc                 INTEGER,
        fee_sc_st               INTEGER,
        fee_pwd                 INTEGER,

        notification_date       TEXT,
        application_start_date  TEXT,
        application_end_date    TEXT,
        exam_date               TEXT,

        job_description         TEXT,
        selection_process       TEXT,
        exam_pattern            TEXT,
        important_instructions  TEXT,
        required_skills         TEXT,
        job_benefits            TEXT,

        source                  TEXT NOT NULL,
        source_url              TEXT NOT NULL,
        scraped_at              TEXT NOT NULL,
        processed_at            TEXT NOT NULL,
        status                  TEXT NOT NULL DEFAULT 'pending_review'
                                CHECK(status IN ('active','draft','pending_review','closed')),
        is_active               BOOLEAN NOT NULL DEFAULT 1,
        content_fingerprint     TEXT,

        meta_title              TEXT NOT NULL,
        meta_description        TEXT NOT NULL,
        json_ld                 TEXT NOT NULL,

        first_seen_at           TEXT NOT NULL,
        last_seen_at            TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_fingerprint ON jobs(content_fingerprint);
    CREATE INDEX IF NOT EXISTS idx_jobs_org ON jobs(organization_name COLLATE NOCASE);
    CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
    CREATE INDEX IF NOT EXISTS idx_jobs_end_date ON jobs(application_end_date);
";

/// SQLite-backed [`JobStore`]. One connection, serialized behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn stats(&self) -> Result<Stats, StoreError> {
        let conn = self.conn()?;
        let total: usize = conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))?;
        let active: usize =
            conn.query_row("SELECT COUNT(*) FROM jobs WHERE is_active = 1", [], |r| r.get(0))?;

        let by_status = group_counts(&conn, "status")?;
        let by_source = group_counts(&conn, "source")?;

        Ok(Stats {
            total,
            active,
            inactive: total - active,
            by_status,
            by_source,
        })
    }

    pub fn overview(
        &self,
        status: Option<JobStatus>,
        source: Option<&str>,
        limit: usize,
    ) -> Result<Vec<OverviewRow>, StoreError> {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(s) = status {
            conditions.push(format!("status = ?{}", params.len() + 1));
            params.push(Box::new(s.as_str()));
        }
        if let Some(s) = source {
            conditions.push(format!("source = ?{} COLLATE NOCASE", params.len() + 1));
            params.push(Box::new(s.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT id, job_title, organization_name, source, status, total_vacancies,
                    application_end_date, last_seen_at
             FROM jobs{}
             ORDER BY last_seen_at DESC, id DESC
             LIMIT {}",
            where_clause, limit
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(OverviewRow {
                    id: row.get(0)?,
                    job_title: row.get(1)?,
                    organization_name: row.get(2)?,
                    source: row.get(3)?,
                    status: row.get(4)?,
                    total_vacancies: row.get(5)?,
                    application_end: row.get(6)?,
                    last_seen_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn group_counts(conn: &Connection, column: &str) -> Result<Vec<(String, usize)>, StoreError> {
    let sql = format!(
        "SELECT {column}, COUNT(*) FROM jobs GROUP BY {column} ORDER BY COUNT(*) DESC, {column}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn opt_i64(v: Option<u64>) -> Option<i64> {
    v.and_then(|v| i64::try_from(v).ok())
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Vec<StoredJob>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, job_title, organization_name, content_fingerprint, first_seen_at, last_seen_at
             FROM jobs WHERE content_fingerprint = ?1",
        )?;
        let rows = stmt
            .query_map([fingerprint], |row| {
                Ok(StoredJob {
                    id: row.get(0)?,
                    job_title: row.get(1)?,
                    organization_name: row.get(2)?,
                    content_fingerprint: row.get(3)?,
                    first_seen_at: row.get(4)?,
                    last_seen_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn insert(&self, r: &NormalizedRecord) -> Result<JobId, StoreError> {
        let states = serde_json::to_string(&r.location.states)?;
        let cities = serde_json::to_string(&r.location.cities)?;
        let qualifications = serde_json::to_string(&r.qualification.required)?;
        let relaxation = r
            .age
            .relaxation
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let json_ld = serde_json::to_string(&seo::job_posting(r))?;

        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO jobs (
                slug, job_title, organization_name, organization_type, notification_url, apply_link,
                total_vacancies, post_category_breakdown, employment_type, position_level,
                states, cities, is_all_india,
                qualifications, min_qualification, max_qualification,
                age_min, age_max, age_relaxation,
                salary_min, salary_max, pay_level,
                application_mode, fee_general, fee_obc, fee_sc_st, fee_pwd,
                notification_date, application_start_date, application_end_date, exam_date,
                job_description, selection_process, exam_pattern, important_instructions,
                required_skills, job_benefits,
                source, source_url, scraped_at, processed_at, status, is_active, content_fingerprint,
                meta_title, meta_description, json_ld, first_seen_at, last_seen_at
             ) VALUES (
                :slug, :job_title, :organization_name, :organization_type, :notification_url, :apply_link,
                :total_vacancies, :breakdown, :employment_type, :position_level,
                :states, :cities, :is_all_india,
                :qualifications, :min_qualification, :max_qualification,
                :age_min, :age_max, :age_relaxation,
                :salary_min, :salary_max, :pay_level,
                :application_mode, :fee_general, :fee_obc, :fee_sc_st, :fee_pwd,
                :notification_date, :application_start_date, :application_end_date, :exam_date,
                :job_description, :selection_process, :exam_pattern, :important_instructions,
                :required_skills, :job_benefits,
                :source, :source_url, :scraped_at, :processed_at, :status, 1, :fingerprint,
                :meta_title, :meta_description, :json_ld, :seen_at, :seen_at
             )",
        )?;

        let fees = &r.application.fees;
        let result = stmt.execute(named_params! {
            ":slug": seo::slug(&r.job_title, &r.organization_name),
            ":job_title": r.job_title,
            ":organization_name": r.organization_name,
            ":organization_type": r.organization_type,
            ":notification_url": r.notification_url,
            ":apply_link": r.apply_link,
            ":total_vacancies": r.vacancies.total,
            ":breakdown": r.vacancies.post_category_breakdown,
            ":employment_type": r.employment_type.as_str(),
            ":position_level": r.position_level.as_str(),
            ":states": states,
            ":cities": cities,
            ":is_all_india": r.location.is_all_india,
            ":qualifications": qualifications,
            ":min_qualification": r.qualification.min,
            ":max_qualification": r.qualification.max,
            ":age_min": r.age.min,
            ":age_max": r.age.max,
            ":age_relaxation": relaxation,
            ":salary_min": opt_i64(r.salary.min),
            ":salary_max": opt_i64(r.salary.max),
            ":pay_level": r.salary.pay_level,
            ":application_mode": r.application.mode.as_str(),
            ":fee_general": fees.general,
            ":fee_obc": fees.obc,
            ":fee_sc_st": fees.sc_st,
            ":fee_pwd": fees.pwd,
            ":notification_date": r.dates.notification,
            ":application_start_date": r.dates.application_start,
            ":application_end_date": r.dates.application_end,
            ":exam_date": r.dates.exam,
            ":job_description": r.sections.job_description,
            ":selection_process": r.sections.selection_process,
            ":exam_pattern": r.sections.exam_pattern,
            ":important_instructions": r.sections.important_instructions,
            ":required_skills": r.sections.required_skills,
            ":job_benefits": r.sections.job_benefits,
            ":source": r.source,
            ":source_url": r.source_url,
            ":scraped_at": r.scraped_at,
            ":processed_at": r.processed_at,
            ":status": r.status.as_str(),
            ":fingerprint": r.content_fingerprint,
            ":meta_title": seo::meta_title(r),
            ":meta_description": seo::meta_description(r),
            ":json_ld": json_ld,
            ":seen_at": r.processed_at,
        });

        match result {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                debug!(id, title = %r.job_title, "inserted job");
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateFingerprint(
                r.content_fingerprint.clone().unwrap_or_default(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn mark_merged(&self, id: JobId, observed_at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE jobs SET last_seen_at = ?1 WHERE id = ?2",
            rusqlite::params![observed_at, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn mark_expired(&self, before: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff: NaiveDate = before.date_naive();
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE jobs SET is_active = 0, status = 'closed'
             WHERE is_active = 1
               AND application_end_date IS NOT NULL
               AND application_end_date < ?1",
            [cutoff],
        )?;
        Ok(changed)
    }

    async fn find_similar(
        &self,
        title: &str,
        organization: &str,
        threshold: f64,
    ) -> Result<Vec<SimilarCandidate>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, job_title, organization_name, content_fingerprint
             FROM jobs WHERE organization_name = ?1 COLLATE NOCASE",
        )?;
        let rows = stmt
            .query_map([organization], |row| {
                Ok((
                    row.get::<_, JobId>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let candidates = rows
            .into_iter()
            .filter_map(|(id, job_title, organization_name, fingerprint)| {
                let score = title_similarity(title, &job_title);
                (score >= threshold).then_some(SimilarCandidate {
                    id,
                    job_title,
                    organization_name,
                    fingerprint,
                    score,
                })
            })
            .collect();
        Ok(rank_candidates(candidates))
    }
}

// ── Reporting ──

#[derive(Debug, Clone)]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub by_status: Vec<(String, usize)>,
    pub by_source: Vec<(String, usize)>,
}

#[derive(Debug, Clone)]
pub struct OverviewRow {
    pub id: JobId,
    pub job_title: String,
    pub organization_name: String,
    pub source: String,
    pub status: String,
    pub total_vacancies: u32,
    pub application_end: Option<NaiveDate>,
    pub last_seen_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::fingerprint;
    use crate::parser::Normalizer;
    use crate::types::RawRecord;
    use chrono::TimeZone;

    fn record(title: &str, source: &str, body: &str) -> NormalizedRecord {
        let raw = RawRecord {
            source: source.into(),
            source_url: "https://example.gov.in".into(),
            title: title.into(),
            organization_name: "Staff Selection Commission".into(),
            organization_type: "Central Government".into(),
            notification_url: Some("https://example.gov.in/notice.pdf".into()),
            apply_link: None,
            raw_text: body.into(),
            date_text: None,
            scraped_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            metadata: serde_json::Value::Null,
        };
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut r = Normalizer::default().normalize_at(&raw, at).unwrap();
        r.content_fingerprint = Some(fingerprint(&r));
        r
    }

    #[tokio::test]
    async fn insert_and_find_by_fingerprint() {
        let store = SqliteStore::open_in_memory().unwrap();
        let r = record(
            "Junior Engineer",
            "SSC",
            "1200 posts. Diploma. Pay Scale Rs. 35400-112400. Kerala. Last date: 15/04/2024",
        );
        let id = store.insert(&r).await.unwrap();

        let fp = r.content_fingerprint.clone().unwrap();
        let found = store.find_by_fingerprint(&fp).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].job_title, "Junior Engineer");
        assert_eq!(found[0].first_seen_at, r.processed_at);

        assert!(store.find_by_fingerprint("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seo_columns_are_written() {
        let store = SqliteStore::open_in_memory().unwrap();
        let r = record("Junior Engineer", "SSC", "Pay Scale Rs. 35400-112400");
        let id = store.insert(&r).await.unwrap();

        let conn = store.conn().unwrap();
        let (slug, meta_title, json_ld): (String, String, String) = conn
            .query_row(
                "SELECT slug, meta_title, json_ld FROM jobs WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(slug, "junior-engineer-staff-selection-commission");
        assert_eq!(meta_title, "Junior Engineer - Staff Selection Commission");
        let doc: serde_json::Value = serde_json::from_str(&json_ld).unwrap();
        assert_eq!(doc["baseSalary"]["value"]["maxValue"], 112400);
    }

    #[tokio::test]
    async fn unique_fingerprint_surfaces_as_duplicate() {
        let store = SqliteStore::open_in_memory().unwrap();
        let r = record("Junior Engineer", "SSC", "");
        store.insert(&r).await.unwrap();
        let err = store.insert(&r).await.unwrap_err();
        match err {
            StoreError::DuplicateFingerprint(fp) => assert_eq!(Some(fp), r.content_fingerprint),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn merge_bumps_last_seen_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        let r = record("Junior Engineer", "SSC", "");
        let id = store.insert(&r).await.unwrap();

        let later = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        store.mark_merged(id, later).await.unwrap();
        let found = store
            .find_by_fingerprint(r.content_fingerprint.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(found[0].first_seen_at, r.processed_at);
        assert_eq!(found[0].last_seen_at, later);

        assert!(matches!(
            store.mark_merged(id + 100, later).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn expire_closes_past_deadlines() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert(&record("Stenographer", "SSC", "Last date: 01/03/2024"))
            .await
            .unwrap();
        store
            .insert(&record("Driver", "SSC", "Last date: 01/03/2031"))
            .await
            .unwrap();
        store.insert(&record("Clerk", "SSC", "")).await.unwrap();

        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(store.mark_expired(now).await.unwrap(), 1);
        assert_eq!(store.mark_expired(now).await.unwrap(), 0);

        let closed = store.overview(Some(JobStatus::Closed), None, 10).unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].job_title, "Stenographer");
        assert_eq!(closed[0].application_end, NaiveDate::from_ymd_opt(2024, 3, 1));

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.inactive, 1);
        assert_eq!(
            stats.by_status,
            vec![("pending_review".to_string(), 2), ("closed".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn overview_filters_by_source() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(&record("Stenographer", "SSC", "")).await.unwrap();
        store.insert(&record("Geo-Scientist", "UPSC", "")).await.unwrap();

        let rows = store.overview(None, Some("upsc"), 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].job_title, "Geo-Scientist");
        assert_eq!(store.overview(None, None, 1).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn similar_ranks_same_organization() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(&record("Junior Engineer", "SSC", "")).await.unwrap();
        store
            .insert(&record("Junior Engineer Civil Mechanical", "SSC", ""))
            .await
            .unwrap();
        store.insert(&record("Stenographer", "SSC", "")).await.unwrap();

        let found = store
            .find_similar("Junior Engineer (Civil)", "STAFF SELECTION COMMISSION", 0.6)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].job_title, "Junior Engineer Civil Mechanical");
        assert!((found[0].score - 0.75).abs() < 1e-9);
        assert!((found[1].score - 2.0 / 3.0).abs() < 1e-9);
    }
}
