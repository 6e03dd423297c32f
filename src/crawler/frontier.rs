//! Link admission: deduplication and robots gating
//!
//! The frontier is the only owner of the visited/to-visit/pending sets and of
//! the robots cache, so none of them need a lock. Every parsed page it
//! consumes marks its URL (and redirect target) visited and feeds the page's
//! links into `pending`; each pass over `pending` then moves URLs whose host
//! policy has resolved either onto the allowed queue or out of the crawl.
//!
//! Pending URLs hold their byte cost until a pass settles them, and only the
//! frontier runs those passes, so it never blocks on the budget. A link that
//! does not fit is parked in a local backlog and retried after each pass.

use crate::config::Config;
use crate::crawler::Fetch;
use crate::output::CrawlCounters;
use crate::pipeline::{BlockingQueue, ByteBudget, ParsedPage};
use crate::robots::{RobotsCache, RobotsPolicy, RobotsStatus};
use crate::state::{PendingDecision, ProgressSets, ScanOutcome};
use crate::url::{host_key, UrlRef};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Result of offering one link to the sets
enum Discovery {
    Added,
    Skipped,
    Deferred(UrlRef),
}

/// Owns the crawl's URL sets and decides which links get fetched
pub struct Frontier {
    sets: ProgressSets,
    deferred: VecDeque<UrlRef>,
    robots: RobotsCache,
    budget: Arc<ByteBudget>,
    allowed: BlockingQueue<String>,
    fetcher: Arc<dyn Fetch>,
    user_agent: String,
    user_agent_full: String,
    robots_timeout: Duration,
    pop_timeout: Duration,
    counters: Arc<CrawlCounters>,
    running: Arc<AtomicBool>,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the robots cache size, user agent and timeouts
    /// * `budget` - Shared byte budget; pending URLs are charged against it
    /// * `allowed` - Output queue drained by the dispatcher
    /// * `fetcher` - Used by robots policies to download robots.txt
    /// * `counters` - Shared crawl counters
    /// * `running` - Pipeline status flag
    pub fn new(
        config: &Config,
        budget: Arc<ByteBudget>,
        allowed: BlockingQueue<String>,
        fetcher: Arc<dyn Fetch>,
        counters: Arc<CrawlCounters>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            sets: ProgressSets::new(),
            deferred: VecDeque::new(),
            robots: RobotsCache::new(config.crawler.robots_cache_capacity),
            budget,
            allowed,
            fetcher,
            user_agent: config.user_agent.crawler_name.clone(),
            user_agent_full: config.user_agent.full_user_agent(),
            robots_timeout: config.crawler.robots_timeout(),
            pop_timeout: config.crawler.pop_timeout(),
            counters,
            running,
        }
    }

    /// Adds a starting URL to `pending`
    ///
    /// Seeds go through the same robots check as discovered links.
    ///
    /// # Returns
    ///
    /// `false` if the URL is unusable or already known
    pub fn seed(&mut self, url: UrlRef) -> bool {
        let added = self.discover(url);
        self.publish_gauges();
        added
    }

    /// Consumes one parsed page
    ///
    /// Marks the page's URL and its effective URL visited, then resolves every
    /// raw link against the effective URL and records the new ones as pending.
    ///
    /// # Returns
    ///
    /// The number of links that were new to the crawl, including any parked
    /// until the byte budget has room
    pub fn ingest(&mut self, page: &ParsedPage) -> usize {
        self.mark_visited(&page.url);
        if page.effective_url != page.url {
            self.mark_visited(&page.effective_url);
        }

        let base = match UrlRef::parse(&page.effective_url) {
            base if base.is_good() && base.is_complete() => base,
            _ => UrlRef::parse(&page.url),
        };
        if !base.is_good() || !base.is_complete() {
            tracing::warn!("No usable base URL for {}, dropping its links", page.url);
            return 0;
        }

        let mut added = 0;
        for raw in &page.raw_links {
            let link = UrlRef::parse(raw).merge(&base);
            if self.discover(link) {
                added += 1;
            }
        }

        tracing::debug!(
            "Ingested {} ({}): {} of {} links new",
            page.url,
            page.http_status,
            added,
            page.raw_links.len()
        );
        added
    }

    /// Settles every pending URL whose host policy has resolved
    ///
    /// A host seen for the first time gets a new policy whose robots.txt
    /// download starts in the background; its URLs stay pending until the
    /// download finishes. A policy that is still downloading, or whose host
    /// still has pending URLs, is never evicted for a newcomer: if the cache
    /// holds nothing else, the newcomer's URLs wait for a later pass.
    /// Admitted URLs are pushed onto the allowed queue. Both admitted and
    /// discarded URLs give their byte cost back.
    pub fn scan_pending(&mut self) -> ScanOutcome {
        let waiting: HashSet<String> = self.sets.pending_urls().filter_map(host_key).collect();
        let robots = &mut self.robots;
        let budget = &self.budget;
        let allowed = &self.allowed;
        let fetcher = &self.fetcher;
        let user_agent = self.user_agent.as_str();
        let user_agent_full = self.user_agent_full.as_str();
        let robots_timeout = self.robots_timeout;

        let outcome = self.sets.scan_pending(|key, url| {
            let Some(host) = host_key(url) else {
                budget.release(key.len() as u64);
                return PendingDecision::Discard;
            };

            let policy = match robots.get(&host) {
                Some(policy) => policy,
                None => {
                    let Some(policy) = RobotsPolicy::for_url(url, user_agent, user_agent_full)
                    else {
                        budget.release(key.len() as u64);
                        return PendingDecision::Discard;
                    };
                    let policy = Arc::new(policy);
                    let in_use = |cached: &RobotsPolicy| {
                        cached.status() == RobotsStatus::Pending || waiting.contains(cached.host())
                    };
                    if robots.try_insert(Arc::clone(&policy), in_use) {
                        tracing::debug!("Fetching {}", policy.robots_url());
                        policy.spawn_initialize(Arc::clone(fetcher), robots_timeout);
                    } else {
                        tracing::trace!("Robots cache busy, {} waits", key);
                    }
                    return PendingDecision::Keep;
                }
            };

            match policy.status() {
                RobotsStatus::Pending => PendingDecision::Keep,
                RobotsStatus::Rules | RobotsStatus::Empty if policy.is_allowed(url) => {
                    allowed.push(key.to_string());
                    budget.release(key.len() as u64);
                    PendingDecision::Admit
                }
                status => {
                    tracing::debug!("Discarding {} (robots {:?})", key, status);
                    budget.release(key.len() as u64);
                    PendingDecision::Discard
                }
            }
        });

        CrawlCounters::add(&self.counters.admitted, outcome.admitted as u64);
        CrawlCounters::add(&self.counters.discarded, outcome.discarded as u64);
        self.publish_gauges();
        outcome
    }

    /// Retries parked links while the byte budget has room
    ///
    /// # Returns
    ///
    /// The number of links moved into `pending`
    pub fn retry_deferred(&mut self) -> usize {
        let mut added = 0;
        while let Some(url) = self.deferred.pop_front() {
            match self.offer(url) {
                Discovery::Added => added += 1,
                Discovery::Skipped => {}
                Discovery::Deferred(url) => {
                    self.deferred.push_front(url);
                    break;
                }
            }
        }
        self.publish_gauges();
        added
    }

    /// Runs the frontier loop until the status flag is cleared
    ///
    /// While links are parked and some pending URL can still free bytes, the
    /// loop stops taking new pages and waits for robots downloads instead.
    ///
    /// # Arguments
    ///
    /// * `input` - Packed [`ParsedPage`] records from the extraction workers
    pub fn run(mut self, input: BlockingQueue<Vec<u8>>) {
        tracing::info!("Frontier started");

        while self.running.load(Ordering::Acquire) {
            let popped = if self.deferred.is_empty() || self.sets.pending_len() == 0 {
                input.pop_timeout(self.pop_timeout)
            } else {
                thread::sleep(self.pop_timeout);
                None
            };
            if let Some(bytes) = &popped {
                CrawlCounters::incr(&self.counters.active);
                self.budget.release(bytes.len() as u64);
                match ParsedPage::from_wire(bytes) {
                    Ok(page) => {
                        self.ingest(&page);
                    }
                    Err(e) => tracing::warn!("Dropping undecodable parsed page: {}", e),
                }
            }

            // The page stays active until its links show up in the gauges
            self.scan_pending();
            self.retry_deferred();
            if popped.is_some() {
                CrawlCounters::decr(&self.counters.active);
            }
        }

        tracing::info!(
            "Frontier stopped: {} visited, {} to visit, {} pending, {} deferred",
            self.sets.visited_len(),
            self.sets.to_visit_len(),
            self.sets.pending_len(),
            self.deferred.len()
        );
    }

    /// Read access to the URL sets
    pub fn sets(&self) -> &ProgressSets {
        &self.sets
    }

    /// Number of hosts with a cached robots policy
    pub fn cached_hosts(&self) -> usize {
        self.robots.len()
    }

    /// Number of links parked until the byte budget has room
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Records a resolved link as pending, or parks it if the budget is full
    fn discover(&mut self, url: UrlRef) -> bool {
        match self.offer(url) {
            Discovery::Added => true,
            Discovery::Skipped => false,
            Discovery::Deferred(url) => {
                tracing::trace!("Byte budget full, parking {}", url);
                self.deferred.push_back(url);
                true
            }
        }
    }

    /// Charges a link's byte cost and adds it to `pending` without waiting
    fn offer(&mut self, url: UrlRef) -> Discovery {
        if !url.is_good() || !url.is_complete() || !url.is_http() {
            return Discovery::Skipped;
        }

        let key = url.canonical();
        if self.sets.progress(&key).is_some() {
            return Discovery::Skipped;
        }

        let cost = key.len() as u64;
        if !self.budget.try_acquire(cost) {
            return Discovery::Deferred(url);
        }
        if self.sets.discover(key, url) {
            Discovery::Added
        } else {
            self.budget.release(cost);
            Discovery::Skipped
        }
    }

    fn mark_visited(&mut self, raw: &str) {
        let url = UrlRef::parse(raw);
        let key = if url.is_good() && url.is_complete() {
            url.canonical()
        } else {
            raw.to_string()
        };

        if self.sets.mark_visited(&key).is_some() {
            self.budget.release(key.len() as u64);
        }
    }

    fn publish_gauges(&self) {
        let waiting = self.sets.pending_len() + self.deferred.len();
        CrawlCounters::set(&self.counters.pending, waiting as u64);
        CrawlCounters::set(&self.counters.visited, self.sets.visited_len() as u64);
    }
}
