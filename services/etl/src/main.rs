//! ETL Service - Transforms the latest snapshots into canonical facts and reports
//!
//! Responsibilities:
//! - Read the latest snapshot of every configured category
//! - Sanitize each category independently (failures are isolated)
//! - Build the summary reports from the combined fact frame
//! - Replace the destination tables with the run output
//!
//! Usage:
//!   cargo run --bin etl -- --config config/sources.json
//!   cargo run --bin etl -- --config config/sources.json --init-db
//!   cargo run --bin etl -- --config config/sources.json --skip-load

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use etl::config::{Config, SourcesConfig};
use etl::load::{load_run, PgSink};
use etl::pipeline::{finish_run, transform_category, CategoryFrames};
use etl::reconcile::Reconciler;
use etl::schema::CINEMA_CATEGORY;
use etl::snapshot;
use sqlx::postgres::PgPoolOptions;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "etl", about = "Transforms raw snapshots into canonical facts and reports")]
struct Args {
    /// Path to sources config file (falls back to the SOURCES env var)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only process this category
    #[arg(long)]
    category: Option<String>,

    /// Category whose frame feeds the cinema report
    #[arg(long, default_value = CINEMA_CATEGORY)]
    cinema_category: String,

    /// Create destination tables before loading
    #[arg(long, default_value = "false")]
    init_db: bool,

    /// Transform and report only - don't write to the database
    #[arg(long, default_value = "false")]
    skip_load: bool,
}

/// Console output plus a daily log file under `log_dir`.
fn init_logging(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    let file_name = format!("etl-{}.log", Local::now().format("%Y-%m-%d"));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(file_name))
        .context("Failed to open log file")?;

    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(())
}

async fn run(args: Args, config: Config, run_id: Uuid) -> Result<()> {
    let sources = SourcesConfig::load(args.config.as_deref())?;
    let reconciler = Reconciler::with_overrides(&sources.corrections);

    let selected = sources.selected(args.category.as_deref());
    if selected.is_empty() {
        anyhow::bail!("No sources match the filter criteria");
    }
    info!(sources = selected.len(), data_dir = %config.data_dir.display(), "processing sources");

    // Transform: one category at a time, failures recorded per category
    let mut frames = CategoryFrames::new();
    for source in selected {
        info!(category = %source.category, "loading category data");
        let outcome = snapshot::read_latest(&config.data_dir, &source.category, config.locale)
            .and_then(|raw| transform_category(raw, &source.schema(), &reconciler));
        frames.record(&source.category, outcome);
    }

    // Reports: fatal on failure, nothing is loaded
    let fecha_carga = Local::now().date_naive();
    let output = finish_run(run_id, &frames, &args.cinema_category, fecha_carga)
        .context("Error creating reports")?;
    output.summary.log();

    if args.skip_load {
        info!("skip-load set - nothing written to database");
        return Ok(());
    }

    // Load
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .context("Failed to connect to database")?;
    let sink = PgSink::new(pool);

    if args.init_db {
        sink.init_schema().await?;
    }
    load_run(&sink, &output).await?;

    info!(
        loaded = output.summary.transformed.len(),
        omitted = output.summary.omitted.len(),
        "run complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = Config::from_env()?;
    init_logging(&config.log_dir)?;

    let run_id = Uuid::new_v4();
    run(args, config, run_id)
        .instrument(info_span!("run", %run_id))
        .await
}
