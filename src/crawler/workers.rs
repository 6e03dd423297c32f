//! Fetch and extraction worker loops
//!
//! Both kinds of worker pop with a bounded wait so they notice the status
//! flag, and both charge the packed size of whatever they push against the
//! shared byte budget. The stage that pops a record is the one that gives
//! its bytes back.

use crate::crawler::{extract, Fetch};
use crate::output::CrawlCounters;
use crate::pipeline::{BlockingQueue, ByteBudget, FetchedPage, ParsedPage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Everything a worker shares with the rest of the pipeline
pub struct WorkerContext {
    pub budget: Arc<ByteBudget>,
    pub counters: Arc<CrawlCounters>,
    pub running: Arc<AtomicBool>,
    pub pop_timeout: Duration,
}

impl WorkerContext {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Charges `bytes` to the budget, then pushes them
    ///
    /// Returns `false` without pushing if the pipeline stopped while waiting.
    fn forward(&self, bytes: Vec<u8>, output: &BlockingQueue<Vec<u8>>) -> bool {
        if !self
            .budget
            .acquire_while(bytes.len() as u64, &self.running, self.pop_timeout)
        {
            return false;
        }
        output.push(bytes);
        true
    }
}

/// Fetches one URL and turns the response into a pipeline record
///
/// A failed request becomes status `0`; any non-2xx response keeps its
/// status but loses its body, so the record still reaches the frontier and
/// the URL is marked visited.
pub fn fetch_page(
    fetcher: &dyn Fetch,
    url: &str,
    timeout: Duration,
    user_agent: &str,
) -> FetchedPage {
    match fetcher.fetch(url, timeout, user_agent) {
        Ok(response) => {
            let success = response.is_success();
            FetchedPage {
                url: url.to_string(),
                effective_url: response.effective_url,
                http_status: response.status,
                body: if success { response.body } else { Vec::new() },
            }
        }
        Err(e) => {
            tracing::warn!("Fetch failed for {}: {}", url, e);
            FetchedPage {
                url: url.to_string(),
                effective_url: url.to_string(),
                http_status: 0,
                body: Vec::new(),
            }
        }
    }
}

/// Runs text and link extraction on a fetched page
///
/// Only 2xx pages are parsed; anything else yields an empty record.
pub fn parse_page(page: FetchedPage) -> ParsedPage {
    let (text, raw_links) = if (200..300).contains(&page.http_status) {
        let extracted = extract(&page.body);
        (extracted.text, extracted.raw_links)
    } else {
        (String::new(), Vec::new())
    };

    ParsedPage {
        url: page.url,
        effective_url: page.effective_url,
        http_status: page.http_status,
        text,
        raw_links,
    }
}

/// Fetch worker loop
///
/// # Arguments
///
/// * `id` - Worker index, used in log lines
/// * `input` - This worker's own URL queue, fed by the dispatcher
/// * `output` - Shared content queue read by the extraction workers
/// * `fetcher` - HTTP collaborator
/// * `timeout` - Per-request timeout
/// * `user_agent` - Value of the `User-Agent` header
/// * `ctx` - Shared pipeline state
pub fn run_fetch_worker(
    id: usize,
    input: BlockingQueue<String>,
    output: BlockingQueue<Vec<u8>>,
    fetcher: Arc<dyn Fetch>,
    timeout: Duration,
    user_agent: String,
    ctx: Arc<WorkerContext>,
) {
    tracing::debug!("Fetch worker {} started", id);

    while ctx.is_running() {
        let Some(url) = input.pop_timeout(ctx.pop_timeout) else {
            continue;
        };
        CrawlCounters::incr(&ctx.counters.active);

        let page = fetch_page(fetcher.as_ref(), &url, timeout, &user_agent);
        tracing::debug!(
            "Fetched {} -> {} ({} bytes)",
            url,
            page.http_status,
            page.body.len()
        );

        let forwarded = ctx.forward(page.to_wire(), &output);
        CrawlCounters::decr(&ctx.counters.active);
        if !forwarded {
            break;
        }
        CrawlCounters::incr(&ctx.counters.fetched);
    }

    tracing::debug!("Fetch worker {} stopped", id);
}

/// Extraction worker loop
///
/// # Arguments
///
/// * `id` - Worker index, used in log lines
/// * `input` - Shared content queue
/// * `output` - Shared parsed queue read by the frontier
/// * `ctx` - Shared pipeline state
pub fn run_extract_worker(
    id: usize,
    input: BlockingQueue<Vec<u8>>,
    output: BlockingQueue<Vec<u8>>,
    ctx: Arc<WorkerContext>,
) {
    tracing::debug!("Extract worker {} started", id);

    while ctx.is_running() {
        let Some(bytes) = input.pop_timeout(ctx.pop_timeout) else {
            continue;
        };
        CrawlCounters::incr(&ctx.counters.active);
        ctx.budget.release(bytes.len() as u64);

        let page = match FetchedPage::from_wire(&bytes) {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Dropping undecodable fetched page: {}", e);
                CrawlCounters::decr(&ctx.counters.active);
                continue;
            }
        };
        drop(bytes);

        let parsed = parse_page(page);
        let forwarded = ctx.forward(parsed.to_wire(), &output);
        CrawlCounters::decr(&ctx.counters.active);
        if !forwarded {
            break;
        }
        CrawlCounters::incr(&ctx.counters.parsed);
    }

    tracing::debug!("Extract worker {} stopped", id);
}
