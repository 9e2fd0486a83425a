use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use job_curator::config::Settings;
use job_curator::db::{JobStore, SqliteStore};
use job_curator::dedup::fingerprint;
use job_curator::parser::Normalizer;
use job_curator::pipeline::Pipeline;
use job_curator::scraper::{Fetcher, Portal};
use job_curator::types::{JobStatus, RawRecord};

#[derive(Parser)]
#[command(name = "job_curator", about = "Government job announcement extraction pipeline")]
struct Cli {
    /// Config file (default: ./curator.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Fetch, normalize, dedupe and store announcements
    Run {
        /// Single portal to run (default: every configured portal)
        #[arg(short, long, value_enum)]
        portal: Option<Portal>,
    },
    /// Normalize one RawRecord JSON file (or plain text) and print the result
    Extract {
        file: PathBuf,
        /// Title to use when the file is plain text (default: first line)
        #[arg(long)]
        title: Option<String>,
        /// Organization to use when the file is plain text
        #[arg(long, default_value = "Unknown Organization")]
        organization: String,
    },
    /// Close postings whose application end date has passed
    Expire,
    /// Show storage statistics
    Stats,
    /// Stored postings overview table
    Overview {
        /// Filter by status (active, draft, pending_review, closed)
        #[arg(short, long)]
        status: Option<JobStatus>,
        /// Filter by source (e.g. "SSC")
        #[arg(long)]
        source: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    info!(db = ?settings.database.path, mode = ?settings.fetch.mode, "settings loaded");

    let result = match cli.command {
        Commands::Init => {
            open_store(&settings.database.path)?;
            println!("Schema ready at {}", settings.database.path.display());
            Ok(())
        }
        Commands::Run { portal } => run(&settings, portal).await,
        Commands::Extract {
            file,
            title,
            organization,
        } => extract(&settings, &file, title, organization),
        Commands::Expire => {
            let store = open_store(&settings.database.path)?;
            let closed = store.mark_expired(Utc::now()).await?;
            println!("Closed {} expired postings.", closed);
            Ok(())
        }
        Commands::Stats => {
            let store = open_store(&settings.database.path)?;
            let s = store.stats()?;
            println!("Total:    {}", s.total);
            println!("Active:   {}", s.active);
            println!("Inactive: {}", s.inactive);
            if !s.by_status.is_empty() {
                println!("\n--- By status ---");
                for (status, n) in &s.by_status {
                    println!("  {:<16} {}", status, n);
                }
            }
            if !s.by_source.is_empty() {
                println!("\n--- By source ---");
                for (source, n) in &s.by_source {
                    println!("  {:<16} {}", source, n);
                }
            }
            Ok(())
        }
        Commands::Overview {
            status,
            source,
            limit,
        } => {
            let store = open_store(&settings.database.path)?;
            let rows = store.overview(status, source.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No postings found.");
                return Ok(());
            }

            println!(
                "{:>5} | {:<36} | {:<28} | {:<8} | {:<14} | {:>6} | {:<10}",
                "ID", "Title", "Organization", "Source", "Status", "Posts", "Last date"
            );
            println!("{}", "-".repeat(126));

            for r in &rows {
                let end = r
                    .application_end
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>5} | {:<36} | {:<28} | {:<8} | {:<14} | {:>6} | {:<10}",
                    r.id,
                    truncate(&r.job_title, 36),
                    truncate(&r.organization_name, 28),
                    truncate(&r.source, 8),
                    r.status,
                    r.total_vacancies,
                    end
                );
            }

            println!("\n{} postings", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_store(path: &Path) -> Result<SqliteStore> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let store = SqliteStore::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    store.init_schema()?;
    Ok(store)
}

async fn run(settings: &Settings, portal: Option<Portal>) -> Result<()> {
    let portals = match portal {
        Some(p) => vec![p],
        None => settings.fetch.portals.clone(),
    };
    if portals.is_empty() {
        println!("No portals configured.");
        return Ok(());
    }

    let store = Arc::new(open_store(&settings.database.path)?);
    let mut pipeline = Pipeline::new(
        Fetcher::from_settings(settings),
        store,
        Normalizer::new(settings.normalize_options()),
        settings.retry_policy(),
    );
    if settings.dedup.check_similar {
        pipeline = pipeline.with_similarity_check(settings.dedup.similarity_threshold);
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!(
        "Running {} portal(s): {}",
        portals.len(),
        portals.iter().map(|p| p.name()).collect::<Vec<_>>().join(", ")
    ));
    pb.enable_steady_tick(Duration::from_millis(120));

    let runs = pipeline.run_all(&portals).await;
    pb.finish_and_clear();

    println!(
        "{:<8} | {:>8} | {:>10} | {:>6}",
        "Portal", "Inserted", "Duplicates", "Failed"
    );
    println!("{}", "-".repeat(42));
    let mut failed_portals = 0;
    for run in &runs {
        match &run.result {
            Ok(c) => println!(
                "{:<8} | {:>8} | {:>10} | {:>6}",
                run.portal.name(),
                c.inserted,
                c.duplicates,
                c.failed
            ),
            Err(e) => {
                failed_portals += 1;
                println!("{:<8} | fetch failed: {}", run.portal.name(), e);
            }
        }
    }

    if failed_portals == runs.len() {
        bail!("every portal failed to fetch");
    }
    Ok(())
}

fn extract(
    settings: &Settings,
    file: &Path,
    title: Option<String>,
    organization: String,
) -> Result<()> {
    let body = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let raw = match serde_json::from_str::<RawRecord>(&body) {
        Ok(raw) => raw,
        Err(_) => {
            let title = title
                .or_else(|| {
                    body.lines()
                        .map(str::trim)
                        .find(|l| !l.is_empty())
                        .map(String::from)
                })
                .unwrap_or_default();
            RawRecord {
                source: "file".into(),
                source_url: file.display().to_string(),
                title,
                organization_name: organization,
                organization_type: String::new(),
                notification_url: None,
                apply_link: None,
                raw_text: body,
                date_text: None,
                scraped_at: Utc::now(),
                metadata: serde_json::Value::Null,
            }
        }
    };

    let mut record = Normalizer::new(settings.normalize_options())
        .normalize(&raw)
        .context("Record could not be normalized")?;
    record.content_fingerprint = Some(fingerprint(&record));
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
