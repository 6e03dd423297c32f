//! Tidemark main entry point
//!
//! This is the command-line interface for the Tidemark web crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tidemark::config::{load_config_with_hash, load_seeds, Config};
use tidemark::crawler::{crawl, HttpFetcher};
use tidemark::output::print_summary;
use tidemark::url::UrlRef;
use tracing_subscriber::EnvFilter;

/// Tidemark: a polite, memory-bounded web crawler
///
/// Tidemark crawls outward from a list of seed URLs while respecting
/// robots.txt and a per-host rate limit, keeping everything it buffers
/// under a fixed byte budget.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version = "1.0.0")]
#[command(about = "A polite, memory-bounded web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// File of seed URLs, separated by whitespace
    #[arg(short, long, value_name = "FILE")]
    seeds: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and seeds and show the crawl plan without crawling
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let seeds = load_seeds(&cli.seeds)
        .with_context(|| format!("failed to load seeds from {}", cli.seeds.display()))?;
    tracing::info!("Loaded {} seed URLs", seeds.len());

    if cli.dry_run {
        handle_dry_run(&config, &seeds);
        return Ok(());
    }

    handle_crawl(config, &seeds)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidemark=info,warn"),
            1 => EnvFilter::new("tidemark=debug,info"),
            2 => EnvFilter::new("tidemark=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the settings and seeds
fn handle_dry_run(config: &Config, seeds: &[UrlRef]) {
    let crawler = &config.crawler;

    println!("=== Tidemark Dry Run ===\n");

    println!("Pipeline:");
    println!("  Fetch workers: {}", crawler.fetchers);
    println!("  Extract workers: {}", crawler.parsers);
    println!("  Byte budget: {} bytes", crawler.byte_budget);
    println!("  Robots cache: {} hosts", crawler.robots_cache_capacity);
    println!(
        "  Host rate limit: {} per {} dispatches",
        crawler.host_rate_limit, crawler.host_window
    );
    println!("  Fetch timeout: {}s", crawler.fetch_timeout_secs);
    println!("  Robots timeout: {}s", crawler.robots_timeout_secs);
    if crawler.max_pages > 0 {
        println!("  Max pages: {}", crawler.max_pages);
    }

    println!("\nUser Agent:");
    println!("  Robots token: {}", config.user_agent.crawler_name);
    println!("  Header: {}", config.user_agent.full_user_agent());

    println!("\nOutput:");
    match &config.output.metrics_path {
        Some(path) => println!(
            "  Metrics: {} every {}s",
            path, config.output.metrics_interval_secs
        ),
        None => println!("  Metrics: log only"),
    }

    println!("\nSeeds ({}):", seeds.len());
    for seed in seeds {
        println!("  * {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URLs", seeds.len());
}

/// Handles the main crawl operation
fn handle_crawl(config: Config, seeds: &[UrlRef]) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new().context("failed to build HTTP client")?;
    let started = std::time::Instant::now();

    match crawl(config, seeds, Arc::new(fetcher)) {
        Ok(summary) => {
            tracing::info!("Crawl completed successfully");
            print_summary(&summary, started.elapsed().as_secs_f64());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
