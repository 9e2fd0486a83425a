use std::path::PathBuf;

use thiserror::Error;

use crate::scraper::Portal;
use crate::types::JobId;

/// Upstream invariant violations. Unparsed fields are never errors.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("raw record has an empty {0} after cleaning")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization: {0}")]
    Json(#[from] serde_json::Error),

    #[error("fingerprint {0} already stored")]
    DuplicateFingerprint(String),

    #[error("store returned {count} records for fingerprint {fingerprint}")]
    MultipleMatches { fingerprint: String, count: usize },

    #[error("no stored record with id {0}")]
    NotFound(JobId),

    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("SPIDER_API_KEY is not configured")]
    MissingApiKey,

    #[error("failed to create spider client: {0}")]
    Client(String),

    #[error("scrape of {url} failed: {message}")]
    Scrape { url: String, message: String },

    #[error("no content in response for {0}")]
    EmptyResponse(String),

    #[error("failed to read fixture {path:?}: {err}")]
    FixtureIo {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("failed to parse fixture {path:?}: {err}")]
    FixtureParse {
        path: PathBuf,
        #[source]
        err: serde_json::Error,
    },
}

impl FetchError {
    /// Configuration and fixture problems will not fix themselves between
    /// attempts; network-side failures might.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Scrape { .. } | Self::EmptyResponse(_))
    }
}

/// Failure confined to a single record; the batch carries on.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A transient error persisted through every retry.
    #[error("fetch for {portal} gave up after {attempts} attempts: {last}")]
    FetchExhausted {
        portal: Portal,
        attempts: u32,
        #[source]
        last: FetchError,
    },
    /// A permanent error; not retried.
    #[error("fetch for {portal} failed: {last}")]
    FetchFailed {
        portal: Portal,
        #[source]
        last: FetchError,
    },
}

impl PipelineError {
    pub fn portal(&self) -> Portal {
        match self {
            Self::FetchExhausted { portal, .. } | Self::FetchFailed { portal, .. } => *portal,
        }
    }
}
