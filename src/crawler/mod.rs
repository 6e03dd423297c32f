//! Crawler module: the stages of the crawl pipeline
//!
//! This module contains the moving parts of a crawl, including:
//! - HTTP fetching behind the [`Fetch`] trait
//! - HTML text and link extraction
//! - The frontier, which deduplicates links and applies robots.txt
//! - The dispatcher, which rate-limits hosts and feeds the fetch workers
//! - Pipeline wiring and thread lifecycle

mod coordinator;
mod dispatcher;
mod fetcher;
mod frontier;
mod parser;
mod workers;

pub use coordinator::{run_until_done, Pipeline, PipelineHandle};
pub use dispatcher::Dispatcher;
pub use fetcher::{build_http_client, Fetch, FetchResponse, HttpFetcher};
pub use frontier::Frontier;
pub use parser::{extract, Extracted};
pub use workers::{fetch_page, parse_page};

use crate::config::Config;
use crate::output::PipelineSnapshot;
use crate::url::UrlRef;
use crate::Result;
use std::sync::Arc;

/// Runs a complete crawl
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the pipeline around `fetcher`
/// 2. Seed the frontier
/// 3. Start every stage
/// 4. Report progress until the crawl runs dry or reaches `max-pages`
/// 5. Stop and join all threads
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `seeds` - Starting URLs
/// * `fetcher` - HTTP collaborator, usually an [`HttpFetcher`]
///
/// # Returns
///
/// * `Ok(PipelineSnapshot)` - Final counters after every thread exited
/// * `Err(TidemarkError)` - A thread could not be started or panicked, or
///   the metrics file could not be written
///
/// # Example
///
/// ```no_run
/// use tidemark::config::{load_config, load_seeds};
/// use tidemark::crawler::{crawl, HttpFetcher};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let seeds = load_seeds(Path::new("seeds.txt"))?;
/// let summary = crawl(config, &seeds, Arc::new(HttpFetcher::new()?))?;
/// println!("{}", summary);
/// # Ok(())
/// # }
/// ```
pub fn crawl(
    config: Config,
    seeds: &[UrlRef],
    fetcher: Arc<dyn Fetch>,
) -> Result<PipelineSnapshot> {
    let output = config.output.clone();
    let max_pages = config.crawler.max_pages;

    let mut pipeline = Pipeline::new(config, fetcher);
    pipeline.seed(seeds);
    let handle = pipeline.start()?;

    let outcome = run_until_done(&handle, &output, max_pages);
    let summary = handle.join()?;
    outcome?;
    Ok(summary)
}
