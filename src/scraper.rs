use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::{debug, info};

use crate::config::{FetchMode, Settings};
use crate::error::FetchError;
use crate::parser::extract::dates::first_date_token;
use crate::parser::text::clean;
use crate::types::RawRecord;

/// Recruitment portals with a listing page we know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    Ssc,
    Upsc,
    Railway,
    Ibps,
}

impl Portal {
    pub const ALL: [Portal; 4] = [Portal::Ssc, Portal::Upsc, Portal::Railway, Portal::Ibps];

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Ssc => "ssc",
            Self::Upsc => "upsc",
            Self::Railway => "railway",
            Self::Ibps => "ibps",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ssc => "SSC",
            Self::Upsc => "UPSC",
            Self::Railway => "Railway",
            Self::Ibps => "IBPS",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Self::Ssc => "https://ssc.nic.in/Portal/LatestAnnouncements",
            Self::Upsc => "https://upsc.gov.in/recruitment",
            Self::Railway => {
                "https://indianrailways.gov.in/railwayboard/view_section.jsp?lang=0&id=0,1,304,366,554,1778"
            }
            Self::Ibps => "https://ibps.in/",
        }
    }

    pub fn organization_name(&self) -> &'static str {
        match self {
            Self::Ssc => "Staff Selection Commission",
            Self::Upsc => "Union Public Service Commission",
            Self::Railway => "Indian Railways",
            Self::Ibps => "Institute of Banking Personnel Selection",
        }
    }

    pub fn organization_type(&self) -> &'static str {
        match self {
            Self::Ssc | Self::Upsc => "Central Government",
            Self::Railway => "Railway",
            Self::Ibps => "Banking",
        }
    }
}

impl fmt::Display for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Produces the raw announcements for one portal.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, portal: Portal) -> Result<Vec<RawRecord>, FetchError>;
}

/// The fetch strategies a run can be configured with.
pub enum Fetcher {
    Spider(SpiderFetcher),
    Fixture(FixtureFetcher),
}

impl Fetcher {
    pub fn from_settings(settings: &Settings) -> Self {
        match settings.fetch.mode {
            FetchMode::Spider => Self::Spider(SpiderFetcher {
                api_key: settings.spider_api_key(),
                max_records: settings.fetch.max_records,
            }),
            FetchMode::Fixture => Self::Fixture(FixtureFetcher {
                dir: settings.fetch.fixture_dir.clone(),
            }),
        }
    }
}

#[async_trait]
impl Fetch for Fetcher {
    async fn fetch(&self, portal: Portal) -> Result<Vec<RawRecord>, FetchError> {
        match self {
            Self::Spider(f) => f.fetch(portal).await,
            Self::Fixture(f) => f.fetch(portal).await,
        }
    }
}

// ── Spider ──

pub struct SpiderFetcher {
    pub api_key: Option<String>,
    pub max_records: usize,
}

#[async_trait]
impl Fetch for SpiderFetcher {
    async fn fetch(&self, portal: Portal) -> Result<Vec<RawRecord>, FetchError> {
        let api_key = self.api_key.clone().ok_or(FetchError::MissingApiKey)?;
        // Client lives for this call only and is dropped on every return path.
        let spider = Spider::new(Some(api_key)).map_err(|e| FetchError::Client(e.to_string()))?;

        let url = portal.url();
        let markdown = scrape_markdown(&spider, url).await?;
        let records = parse_listing(portal, &markdown, self.max_records, Utc::now());
        info!(portal = %portal, count = records.len(), "parsed listing page");
        Ok(records)
    }
}

async fn scrape_markdown(spider: &Spider, url: &str) -> Result<String, FetchError> {
    let params = RequestParams {
        return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Markdown)),
        ..Default::default()
    };

    let response = spider
        .scrape_url(url, Some(params), "application/json")
        .await
        .map_err(|e| FetchError::Scrape {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    let parsed: serde_json::Value = match response.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
        None => response,
    };

    parsed
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .map(strip_images)
        .ok_or_else(|| FetchError::EmptyResponse(url.to_string()))
}

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).unwrap());
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*_#>|`]+").unwrap());

/// Link texts that are site chrome rather than announcements.
const NAV_NOISE: &[&str] = &[
    "home", "login", "log in", "sign in", "register", "contact", "about", "sitemap", "skip to",
    "faq", "help", "screen reader", "disclaimer", "privacy", "terms", "feedback", "archive",
    "back", "next", "previous", "more", "view all", "read more",
];

/// Remove markdown image syntax: ![alt](url) and [![alt](url)](link)
fn strip_images(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANKS_RE.replace_all(&cleaned, "\n\n").to_string()
}

/// Turn a listing page into one RawRecord per announcement link line, in
/// page order, capped at `max_records`.
pub fn parse_listing(
    portal: Portal,
    markdown: &str,
    max_records: usize,
    scraped_at: DateTime<Utc>,
) -> Vec<RawRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for line in markdown.lines() {
        if records.len() >= max_records {
            break;
        }
        let Some((title, href)) = announcement_link(line) else {
            continue;
        };
        let link = absolutize(portal.url(), href);
        if !seen.insert(link.clone()) {
            continue;
        }

        let line_text = clean(&MARKUP_RE.replace_all(&LINK_RE.replace_all(line, "$1"), " "));
        let is_pdf = link
            .split(['?', '#'])
            .next()
            .is_some_and(|path| path.to_ascii_lowercase().ends_with(".pdf"));

        debug!(portal = %portal, title = %title, link = %link, "announcement");
        records.push(RawRecord {
            source: portal.name().to_string(),
            source_url: portal.url().to_string(),
            title,
            organization_name: portal.organization_name().to_string(),
            organization_type: portal.organization_type().to_string(),
            notification_url: is_pdf.then(|| link.clone()),
            apply_link: (!is_pdf).then(|| link.clone()),
            date_text: first_date_token(&line_text),
            raw_text: line_text,
            scraped_at,
            metadata: serde_json::json!({ "page_url": portal.url(), "link": link }),
        });
    }
    records
}

/// First link on the line whose text looks like an announcement title.
fn announcement_link(line: &str) -> Option<(String, &str)> {
    LINK_RE.captures_iter(line).find_map(|caps| {
        let text = clean(&MARKUP_RE.replace_all(caps.get(1)?.as_str(), " "));
        let href = caps.get(2)?.as_str();
        if text.chars().count() < 5 || is_nav_noise(&text) {
            return None;
        }
        let lower = href.to_ascii_lowercase();
        if lower.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("mailto:") {
            return None;
        }
        Some((text, href))
    })
}

fn is_nav_noise(text: &str) -> bool {
    let lower = text.to_lowercase();
    NAV_NOISE
        .iter()
        .any(|n| lower == *n || (lower.starts_with(n) && lower.len() < n.len() + 12))
}

/// Resolve a listing href against the page it came from.
fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let (scheme, rest) = base.split_once("://").unwrap_or(("https", base));
    let host = rest.split('/').next().unwrap_or(rest);
    if let Some(stripped) = href.strip_prefix("//") {
        return format!("{scheme}://{stripped}");
    }
    if href.starts_with('/') {
        return format!("{scheme}://{host}{href}");
    }
    let path = rest.split(['?', '#']).next().unwrap_or(rest);
    let dir = match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    };
    if dir.is_empty() {
        format!("{scheme}://{host}/{href}")
    } else {
        format!("{scheme}://{dir}{href}")
    }
}

// ── Fixture ──

/// Reads `<dir>/<portal-slug>.json`, a JSON array of RawRecord.
pub struct FixtureFetcher {
    pub dir: PathBuf,
}

#[async_trait]
impl Fetch for FixtureFetcher {
    async fn fetch(&self, portal: Portal) -> Result<Vec<RawRecord>, FetchError> {
        let path = self.dir.join(format!("{}.json", portal.slug()));
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| FetchError::FixtureIo {
                path: path.clone(),
                err,
            })?;
        let records: Vec<RawRecord> =
            serde_json::from_str(&body).map_err(|err| FetchError::FixtureParse { path, err })?;
        debug!(portal = %portal, count = records.len(), "loaded fixture");
        Ok(records)
    }
}

// ── Tests ──
