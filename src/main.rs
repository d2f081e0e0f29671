mod config;
mod dedup;
mod error;
mod models;
mod normalize;
mod scrapers;
mod store;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::CrawlConfig;
use scrapers::{ChromeRenderer, CrawlController, CrawlReport, Outcome};
use store::{ListingStore, Sink, SnapshotLog, SqliteStore};

#[derive(Parser)]
#[command(name = "listing-tracker", about = "Used-vehicle listing crawler with price tracking")]
struct Cli {
    /// TOML config file
    #[arg(long, env = "LISTING_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, env = "LISTING_DB", global = true)]
    db: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the catalog and update the store
    Crawl {
        /// Result offset of the first catalog page
        #[arg(long)]
        start_offset: Option<u32>,
        /// Max catalog pages to crawl (default: until the last page)
        #[arg(short = 'n', long)]
        pages: Option<usize>,
        /// Keep one browser session for the whole crawl
        #[arg(long)]
        no_recycle: bool,
        /// Show the browser window
        #[arg(long)]
        headful: bool,
        /// Crawl against a throwaway in-memory store, no CSV log
        #[arg(long)]
        dry_run: bool,
    },
    /// List every tracked listing key
    Keys,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "listing_tracker=debug"
    } else {
        "listing_tracker=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config =
        CrawlConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command {
        Commands::Crawl {
            start_offset,
            pages,
            no_recycle,
            headful,
            dry_run,
        } => {
            if let Some(offset) = start_offset {
                config.start_offset = offset;
            }
            if pages.is_some() {
                config.max_pages = pages;
            }
            if no_recycle {
                config.recycle_session = false;
            }
            if headful {
                config.headless = false;
            }
            config.validate().context("Invalid configuration")?;

            let report = tokio::task::spawn_blocking(move || crawl(config, dry_run))
                .await
                .context("Crawl task panicked")??;

            let ending = match &report.outcome {
                Outcome::Done => "completed".to_string(),
                Outcome::Aborted { url } => format!("stopped at {url}"),
            };
            println!(
                "Crawl {}: {} pages, {} snapshots, {} new, {} price updates, {} unchanged, {} skipped",
                ending,
                report.pages,
                report.snapshots,
                report.created,
                report.updated,
                report.unchanged,
                report.skipped
            );
        }
        Commands::Keys => {
            let store = SqliteStore::open(&config.db_path)
                .with_context(|| format!("Failed to open {}", config.db_path.display()))?;
            let keys = store.all_listing_keys()?;
            for key in &keys {
                println!("{key}");
            }
            info!(
                "{} listings, {} snapshots in {}",
                keys.len(),
                store.snapshot_count()?,
                config.db_path.display()
            );
        }
    }

    Ok(())
}

fn crawl(config: CrawlConfig, dry_run: bool) -> anyhow::Result<CrawlReport> {
    let sink = if dry_run {
        info!("Dry run: nothing will be persisted");
        Sink::new(SqliteStore::open_in_memory()?, None)
    } else {
        let store = SqliteStore::open(&config.db_path)
            .with_context(|| format!("Failed to open {}", config.db_path.display()))?;
        let log = SnapshotLog::create(&config.output_dir, &config.site_name)
            .context("Failed to create snapshot log")?;
        info!("Writing snapshots to {}", log.path().display());
        Sink::new(store, Some(log))
    };

    let renderer = ChromeRenderer::launch(config.headless)?;
    let mut controller = CrawlController::new(&config, renderer, sink)?;
    let report = controller.run()?;

    let store = controller.finish()?;
    info!("{} listings tracked", store.all_listing_keys()?.len());
    Ok(report)
}
