use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::warn;

use crate::parser::NormalizeOptions;
use crate::retry::RetryPolicy;
use crate::scraper::Portal;

const DEFAULT_CONFIG_FILE: &str = "curator.toml";
const ENV_PREFIX: &str = "CURATOR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub fetch: FetchSettings,
    pub retry: RetrySettings,
    pub normalize: NormalizeSettings,
    pub dedup: DedupSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/jobs.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Spider,
    Fixture,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub mode: FetchMode,
    pub fixture_dir: PathBuf,
    pub max_records: usize,
    pub spider_api_key: Option<String>,
    pub portals: Vec<Portal>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            mode: FetchMode::default(),
            fixture_dir: PathBuf::from("fixtures"),
            max_records: 25,
            spider_api_key: None,
            portals: Portal::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizeSettings {
    pub title_max_len: usize,
    pub section_window: usize,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            title_max_len: 200,
            section_window: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupSettings {
    pub check_similar: bool,
    pub similarity_threshold: f64,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            check_similar: true,
            similarity_threshold: 0.6,
        }
    }
}

impl Settings {
    /// Defaults, then `curator.toml` (or `path`), then `CURATOR__*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(settings.sanitized())
    }

    fn sanitized(mut self) -> Self {
        if self.retry.max_attempts == 0 {
            warn!("retry.max_attempts must be at least 1, using 1");
            self.retry.max_attempts = 1;
        }
        if !(0.0..=1.0).contains(&self.dedup.similarity_threshold) {
            let clamped = self.dedup.similarity_threshold.clamp(0.0, 1.0);
            warn!(
                configured = self.dedup.similarity_threshold,
                clamped, "dedup.similarity_threshold out of range"
            );
            self.dedup.similarity_threshold = clamped;
        }
        if self.normalize.title_max_len == 0 {
            warn!("normalize.title_max_len must be positive, using default");
            self.normalize.title_max_len = NormalizeSettings::default().title_max_len;
        }
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            title_max_len: self.normalize.title_max_len,
            section_window: self.normalize.section_window,
        }
    }

    /// Explicit setting first, then the `SPIDER_API_KEY` variable the spider
    /// client conventionally reads.
    pub fn spider_api_key(&self) -> Option<String> {
        self.fetch
            .spider_api_key
            .clone()
            .or_else(|| std::env::var("SPIDER_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}
