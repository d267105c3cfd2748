//! Collector Service - Downloads the current open-data extracts as dated snapshots
//!
//! Responsibilities:
//! - Fetch every configured category CSV from its public URL
//! - Store it under the dated snapshot layout the ETL service reads from
//! - Skip rewriting a snapshot whose content has not changed today
//!
//! Usage:
//!   # All enabled sources:
//!   cargo run --bin collector -- --config config/sources.json
//!
//!   # One category:
//!   cargo run --bin collector -- --config config/sources.json --category museos

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use etl::config::{Config, Source, SourcesConfig};
use etl::snapshot::{snapshot_path, MonthLocale};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "collector", about = "Downloads category extracts as dated snapshots")]
struct Args {
    /// Path to sources config file (falls back to the SOURCES env var)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only collect this category
    #[arg(long)]
    category: Option<String>,

    /// Rewrite today's snapshot even if the content is unchanged
    #[arg(long, default_value = "false")]
    force: bool,

    /// Dry run - download but don't write snapshots
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WriteOutcome {
    Saved(PathBuf),
    Unchanged(PathBuf),
    DryRun(PathBuf),
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

/// Write `bytes` to `path`, unless an identical file is already there.
async fn write_snapshot(path: &Path, bytes: &[u8], force: bool, dry_run: bool) -> Result<WriteOutcome> {
    if !force {
        if let Ok(existing) = fs::read(path).await {
            if content_hash(&existing) == content_hash(bytes) {
                return Ok(WriteOutcome::Unchanged(path.to_path_buf()));
            }
        }
    }
    if dry_run {
        return Ok(WriteOutcome::DryRun(path.to_path_buf()));
    }

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(WriteOutcome::Saved(path.to_path_buf()))
}

/// Download one source into today's snapshot slot.
async fn fetch_source(
    client: &reqwest::Client,
    data_dir: &Path,
    locale: MonthLocale,
    source: &Source,
    today: NaiveDate,
    args: &Args,
) -> Result<WriteOutcome> {
    info!(category = %source.category, link = %source.link, "downloading category data");
    let resp = client
        .get(&source.link)
        .send()
        .await?
        .error_for_status()
        .context("HTTP request failed")?;
    let bytes = resp.bytes().await?;
    info!(
        category = %source.category,
        bytes = bytes.len(),
        hash = %content_hash(&bytes),
        "downloaded category data"
    );

    let path = snapshot_path(data_dir, &source.category, today, locale);
    write_snapshot(&path, &bytes, args.force, args.dry_run).await
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let sources = SourcesConfig::load(args.config.as_deref())?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .user_agent("cultura-etl-collector/0.1")
        .build()?;

    let selected = sources.selected(args.category.as_deref());
    if selected.is_empty() {
        anyhow::bail!("No sources match the filter criteria");
    }

    let today = Local::now().date_naive();
    let mut collected = 0;
    let mut unchanged = 0;
    let mut failed = 0;

    for source in selected {
        match fetch_source(&client, &config.data_dir, config.locale, source, today, &args).await {
            Ok(WriteOutcome::Saved(path)) => {
                info!(category = %source.category, path = %path.display(), "saved snapshot");
                collected += 1;
            }
            Ok(WriteOutcome::Unchanged(path)) => {
                info!(category = %source.category, path = %path.display(), "snapshot unchanged");
                unchanged += 1;
            }
            Ok(WriteOutcome::DryRun(path)) => {
                info!(category = %source.category, path = %path.display(), "dry run - would save snapshot");
            }
            Err(e) => {
                error!(category = %source.category, error = %e, "error downloading category data");
                failed += 1;
            }
        }
    }

    info!(collected, unchanged, failed, "collection summary");
    if failed > 0 {
        warn!(failed, "some categories could not be downloaded");
    }
    Ok(())
}
