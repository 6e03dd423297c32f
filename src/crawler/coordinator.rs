//! Pipeline wiring - builds the stages and runs them on OS threads
//!
//! This module owns the lifecycle of a crawl:
//! - Creating the byte budget, queues and counters
//! - Seeding the frontier
//! - Spawning the fetch, extract, frontier and dispatcher threads
//! - Reporting progress and shutting the threads down

use crate::config::{Config, OutputConfig};
use crate::crawler::dispatcher::Dispatcher;
use crate::crawler::frontier::Frontier;
use crate::crawler::workers::{run_extract_worker, run_fetch_worker, WorkerContext};
use crate::crawler::Fetch;
use crate::output::{CrawlCounters, MetricsLog, PipelineSnapshot};
use crate::pipeline::{BlockingQueue, ByteBudget};
use crate::url::UrlRef;
use crate::{Result, TidemarkError};
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Queue handles shared by the pipeline and its handle
#[derive(Clone)]
struct Queues {
    allowed: BlockingQueue<String>,
    urls: Vec<BlockingQueue<String>>,
    contents: BlockingQueue<Vec<u8>>,
    parsed: BlockingQueue<Vec<u8>>,
}

/// A crawl pipeline that has been built but not started
pub struct Pipeline {
    config: Config,
    fetcher: Arc<dyn Fetch>,
    budget: Arc<ByteBudget>,
    counters: Arc<CrawlCounters>,
    running: Arc<AtomicBool>,
    queues: Queues,
    frontier: Frontier,
}

impl Pipeline {
    /// Creates the budget, queues, counters and frontier for one crawl
    ///
    /// # Arguments
    ///
    /// * `config` - Validated crawler configuration
    /// * `fetcher` - HTTP collaborator used for pages and robots.txt
    pub fn new(config: Config, fetcher: Arc<dyn Fetch>) -> Self {
        let budget = Arc::new(ByteBudget::new(config.crawler.byte_budget));
        let counters = Arc::new(CrawlCounters::new());
        let running = Arc::new(AtomicBool::new(true));

        let queues = Queues {
            allowed: BlockingQueue::new(),
            urls: (0..config.crawler.fetchers.max(1))
                .map(|_| BlockingQueue::new())
                .collect(),
            contents: BlockingQueue::new(),
            parsed: BlockingQueue::new(),
        };

        let frontier = Frontier::new(
            &config,
            Arc::clone(&budget),
            queues.allowed.clone(),
            Arc::clone(&fetcher),
            Arc::clone(&counters),
            Arc::clone(&running),
        );

        Self {
            config,
            fetcher,
            budget,
            counters,
            running,
            queues,
            frontier,
        }
    }

    /// Hands the starting URLs to the frontier
    ///
    /// # Returns
    ///
    /// The number of seeds that were new
    pub fn seed(&mut self, seeds: &[UrlRef]) -> usize {
        let added = seeds
            .iter()
            .filter(|url| self.frontier.seed((*url).clone()))
            .count();
        tracing::info!("Seeded frontier with {} of {} URLs", added, seeds.len());
        added
    }

    /// Spawns every stage on its own named thread
    ///
    /// # Returns
    ///
    /// * `Ok(PipelineHandle)` - All threads are running
    /// * `Err(TidemarkError)` - A thread could not be spawned; any threads
    ///   already started have been told to stop
    pub fn start(self) -> Result<PipelineHandle> {
        let Pipeline {
            config,
            fetcher,
            budget,
            counters,
            running,
            queues,
            frontier,
        } = self;

        let mut handle = PipelineHandle {
            running: Arc::clone(&running),
            threads: Vec::new(),
            queues: queues.clone(),
            budget: Arc::clone(&budget),
            counters: Arc::clone(&counters),
            started: Instant::now(),
        };

        let pop_timeout = config.crawler.pop_timeout();
        let ctx = Arc::new(WorkerContext {
            budget,
            counters: Arc::clone(&counters),
            running: Arc::clone(&running),
            pop_timeout,
        });
        let user_agent = config.user_agent.full_user_agent();
        let fetch_timeout = config.crawler.fetch_timeout();

        for (id, input) in queues.urls.iter().enumerate() {
            let input = input.clone();
            let output = queues.contents.clone();
            let fetcher = Arc::clone(&fetcher);
            let user_agent = user_agent.clone();
            let ctx = Arc::clone(&ctx);
            handle.spawn(format!("fetcher-{}", id), move || {
                run_fetch_worker(id, input, output, fetcher, fetch_timeout, user_agent, ctx)
            })?;
        }

        for id in 0..config.crawler.parsers.max(1) {
            let input = queues.contents.clone();
            let output = queues.parsed.clone();
            let ctx = Arc::clone(&ctx);
            handle.spawn(format!("parser-{}", id), move || {
                run_extract_worker(id, input, output, ctx)
            })?;
        }

        let parsed = queues.parsed.clone();
        handle.spawn("frontier".to_string(), move || frontier.run(parsed))?;

        let dispatcher = Dispatcher::new(
            queues.allowed.clone(),
            queues.urls.clone(),
            config.crawler.host_window,
            config.crawler.host_rate_limit,
            counters,
        );
        let dispatcher_running = Arc::clone(&running);
        handle.spawn("dispatcher".to_string(), move || {
            dispatcher.run(dispatcher_running, pop_timeout)
        })?;

        tracing::info!(
            "Pipeline started: {} fetchers, {} parsers, {} byte budget",
            queues.urls.len(),
            config.crawler.parsers.max(1),
            config.crawler.byte_budget
        );
        Ok(handle)
    }
}

/// Control handle for a running pipeline
pub struct PipelineHandle {
    running: Arc<AtomicBool>,
    threads: Vec<(String, JoinHandle<()>)>,
    queues: Queues,
    budget: Arc<ByteBudget>,
    counters: Arc<CrawlCounters>,
    started: Instant,
}

impl PipelineHandle {
    fn spawn<F>(&mut self, name: String, body: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        match thread::Builder::new().name(name.clone()).spawn(body) {
            Ok(join) => {
                self.threads.push((name, join));
                Ok(())
            }
            Err(e) => {
                self.shutdown();
                Err(TidemarkError::Thread(format!("failed to spawn {}: {}", name, e)))
            }
        }
    }

    /// Reads queue depths, counters and budget usage
    pub fn snapshot(&self) -> PipelineSnapshot {
        let c = &self.counters;
        PipelineSnapshot {
            taken_at: Utc::now(),
            urls_queued: self.queues.urls.iter().map(|q| q.len() as u64).sum(),
            allowed_queued: self.queues.allowed.len() as u64,
            contents_queued: self.queues.contents.len() as u64,
            parsed_queued: self.queues.parsed.len() as u64,
            fetched: CrawlCounters::get(&c.fetched),
            parsed: CrawlCounters::get(&c.parsed),
            admitted: CrawlCounters::get(&c.admitted),
            discarded: CrawlCounters::get(&c.discarded),
            requeued: CrawlCounters::get(&c.requeued),
            pending: CrawlCounters::get(&c.pending),
            visited: CrawlCounters::get(&c.visited),
            active: CrawlCounters::get(&c.active),
            bytes_held: self.budget.current(),
            byte_budget: self.budget.max(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Time since the pipeline was started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Tells every stage to stop
    ///
    /// Stages notice within one pop timeout; a fetch already in progress
    /// finishes first.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            tracing::info!("Shutting down pipeline");
        }
    }

    /// Stops the pipeline and waits for every thread
    ///
    /// # Returns
    ///
    /// * `Ok(PipelineSnapshot)` - Final state after all threads exited
    /// * `Err(TidemarkError::Thread)` - A stage panicked
    pub fn join(mut self) -> Result<PipelineSnapshot> {
        self.shutdown();

        let mut panicked = Vec::new();
        for (name, join) in std::mem::take(&mut self.threads) {
            if join.join().is_err() {
                tracing::error!("Thread {} panicked", name);
                panicked.push(name);
            }
        }

        let snapshot = self.snapshot();
        if panicked.is_empty() {
            Ok(snapshot)
        } else {
            Err(TidemarkError::Thread(format!(
                "panicked: {}",
                panicked.join(", ")
            )))
        }
    }
}

/// Drives a started pipeline until it runs out of work or hits `max_pages`
///
/// Every `metrics_interval_secs` a snapshot is logged and, if configured,
/// appended to the metrics file. The crawl counts as finished after two
/// consecutive idle snapshots.
///
/// # Arguments
///
/// * `handle` - The running pipeline
/// * `output` - Metrics settings
/// * `max_pages` - Stop once this many pages were fetched; 0 for no limit
///
/// # Returns
///
/// * `Ok(PipelineSnapshot)` - The last snapshot taken before returning
/// * `Err(TidemarkError)` - The metrics file could not be written
pub fn run_until_done(
    handle: &PipelineHandle,
    output: &OutputConfig,
    max_pages: u64,
) -> Result<PipelineSnapshot> {
    let mut metrics = match &output.metrics_path {
        Some(path) => Some(MetricsLog::open(Path::new(path))?),
        None => None,
    };
    let interval = Duration::from_secs(output.metrics_interval_secs.max(1));

    let mut idle_streak = 0;
    loop {
        thread::sleep(interval);
        let snapshot = handle.snapshot();

        tracing::info!(
            "Progress: {} fetched, {} parsed, {} pending, {} queued, {:.1}% of byte budget",
            snapshot.fetched,
            snapshot.parsed,
            snapshot.pending,
            snapshot.urls_queued + snapshot.allowed_queued,
            snapshot.budget_used_percent()
        );
        if let Some(log) = metrics.as_mut() {
            log.record(&snapshot)?;
        }

        if !handle.is_running() {
            return Ok(snapshot);
        }
        if max_pages > 0 && snapshot.fetched >= max_pages {
            tracing::info!("Reached max-pages limit of {}", max_pages);
            return Ok(snapshot);
        }

        idle_streak = if snapshot.is_idle() { idle_streak + 1 } else { 0 };
        if idle_streak >= 2 {
            tracing::info!("Frontier is exhausted, crawl complete");
            return Ok(snapshot);
        }
    }
}
