//! Book Catalog main entry point
//!
//! This is the command-line interface for scraping, loading and serving the
//! book catalog.

use anyhow::Context;
use book_catalog::api::{serve, AppState};
use book_catalog::config::{load_config_with_hash, Config};
use book_catalog::output::{
    load_category_stats, load_overview, print_load_report, print_scrape_report, print_statistics,
};
use book_catalog::scrape::run_scrape;
use book_catalog::storage::open_storage;
use book_catalog::load_export;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Book Catalog: scrape, load and serve a book listing
///
/// Scrapes every category of the configured listing site into a CSV export,
/// loads the export into SQLite and serves it over a REST API.
#[derive(Parser, Debug)]
#[command(name = "book-catalog")]
#[command(version = "1.0.0")]
#[command(about = "Scrape, load and serve a book listing", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Scrape the site and write the CSV export, then exit
    #[arg(long, conflicts_with_all = ["load", "rescrape", "stats", "dry_run"])]
    scrape: bool,

    /// Load the CSV export into the database, then exit
    #[arg(long, conflicts_with_all = ["scrape", "rescrape", "stats", "dry_run"])]
    load: bool,

    /// CSV file to load instead of the configured export path
    #[arg(long, value_name = "PATH", requires = "load")]
    csv: Option<PathBuf>,

    /// Scrape and then load, then exit
    #[arg(long, conflicts_with_all = ["scrape", "load", "stats", "dry_run"])]
    rescrape: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["scrape", "load", "rescrape", "dry_run"])]
    stats: bool,

    /// Validate config and show what would run without doing it
    #[arg(long, conflicts_with_all = ["scrape", "load", "rescrape", "stats"])]
    dry_run: bool,

    /// Override the configured listening port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, cli.port);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.scrape {
        handle_scrape(&config).await?;
    } else if cli.load {
        let csv = cli
            .csv
            .unwrap_or_else(|| PathBuf::from(&config.storage.export_path));
        handle_load(&config, &csv)?;
    } else if cli.rescrape {
        handle_scrape(&config).await?;
        handle_load(&config, Path::new(&config.storage.export_path))?;
    } else {
        handle_serve(config, cli.port).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("book_catalog=info,warn"),
            1 => EnvFilter::new("book_catalog=debug,tower_http=debug,info"),
            2 => EnvFilter::new("book_catalog=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &Config, port: Option<u16>) {
    println!("=== Book Catalog Dry Run ===\n");

    println!("Scraper:");
    println!("  Base URL: {}", config.scraper.base_url);
    println!("  User agent: {}", config.scraper.user_agent);
    println!("  Page delay: {}ms", config.scraper.page_delay_ms);
    println!(
        "  Max pages per category: {}",
        config.scraper.max_pages_per_category
    );
    println!("  Request timeout: {}s", config.scraper.request_timeout_secs);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Export: {}", config.storage.export_path);

    println!("\nServer:");
    println!(
        "  Listen: {}:{}",
        config.server.host,
        port.unwrap_or(config.server.port)
    );
    println!("  Auth tokens: {}", config.auth.tokens.len());

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;

    let overview = load_overview(&storage)?;
    let categories = load_category_stats(&storage)?;
    print_statistics(&overview, &categories);

    Ok(())
}

/// Handles the --scrape mode: scrapes every category and writes the export
async fn handle_scrape(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Starting scrape of {}", config.scraper.base_url);

    match run_scrape(config).await {
        Ok(report) => {
            print_scrape_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the --load mode: replaces the database contents from a CSV file
fn handle_load(config: &Config, csv: &Path) -> anyhow::Result<()> {
    let mut storage = open_storage(Path::new(&config.storage.database_path))?;

    match load_export(&mut storage, csv) {
        Ok(report) => {
            print_load_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Data loading failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the default mode: serves the REST API
async fn handle_serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.storage.database_path))?;
    if config.auth.tokens.is_empty() {
        tracing::warn!("No auth tokens configured; the scrape trigger will reject every request");
    }

    let host = config.server.host.clone();
    let port = port.unwrap_or(config.server.port);
    let state = AppState::new(config, storage);

    serve(state, &host, port).await?;
    Ok(())
}
