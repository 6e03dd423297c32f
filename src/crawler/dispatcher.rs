//! Per-host rate limiting and fetch-queue assignment

use crate::output::CrawlCounters;
use crate::pipeline::BlockingQueue;
use crate::state::HostWindow;
use crate::url::{host_key, UrlRef};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Moves admitted URLs from the allowed queue to the fetch workers
///
/// Each host may receive at most `ceiling` dispatches per window; a URL for a
/// saturated host goes back to the end of the allowed queue. Dispatched URLs
/// are dealt to the worker queues in strict rotation.
pub struct Dispatcher {
    allowed: BlockingQueue<String>,
    outputs: Vec<BlockingQueue<String>>,
    window: HostWindow,
    next: usize,
    refusals: usize,
    counters: Arc<CrawlCounters>,
}

impl Dispatcher {
    /// Creates a dispatcher
    ///
    /// # Arguments
    ///
    /// * `allowed` - Queue filled by the frontier, also the re-queue target
    /// * `outputs` - One input queue per fetch worker; must not be empty
    /// * `window` - Window length in decisions and size of the host history
    /// * `ceiling` - Dispatches allowed per host within one window
    /// * `counters` - Shared crawl counters
    pub fn new(
        allowed: BlockingQueue<String>,
        outputs: Vec<BlockingQueue<String>>,
        window: usize,
        ceiling: u32,
        counters: Arc<CrawlCounters>,
    ) -> Self {
        Self {
            allowed,
            outputs,
            window: HostWindow::new(window, ceiling),
            next: 0,
            refusals: 0,
            counters,
        }
    }

    /// Makes one rate-limit decision for `url`
    ///
    /// # Returns
    ///
    /// `true` if the URL went to a fetch worker, `false` if it was re-queued
    /// or dropped
    pub fn dispatch(&mut self, url: String) -> bool {
        let Some(host) = host_key(&UrlRef::parse(&url)) else {
            tracing::warn!("Dropping {}: no host", url);
            return false;
        };

        if self.outputs.is_empty() {
            self.allowed.push(url);
            return false;
        }

        if self.window.try_dispatch(&host) {
            let slot = self.next;
            self.next = (self.next + 1) % self.outputs.len();
            tracing::trace!("Dispatching {} to fetcher {}", url, slot);
            self.outputs[slot].push(url);
            self.refusals = 0;
            true
        } else {
            self.allowed.push(url);
            self.refusals += 1;
            CrawlCounters::incr(&self.counters.requeued);
            false
        }
    }

    /// Runs the dispatch loop until the status flag is cleared
    ///
    /// When a whole pass over the allowed queue is refused, the loop sleeps
    /// for `pop_timeout` before trying again.
    pub fn run(mut self, running: Arc<AtomicBool>, pop_timeout: Duration) {
        tracing::info!("Dispatcher started with {} fetch queues", self.outputs.len());

        while running.load(Ordering::Acquire) {
            let Some(url) = self.allowed.pop_timeout(pop_timeout) else {
                continue;
            };
            CrawlCounters::incr(&self.counters.active);
            self.dispatch(url);
            CrawlCounters::decr(&self.counters.active);

            if self.refusals > self.allowed.len() {
                self.refusals = 0;
                thread::sleep(pop_timeout);
            }
        }

        tracing::info!(
            "Dispatcher stopped after {} decisions, {} hosts tracked",
            self.window.seq(),
            self.window.tracked_hosts()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher(
        workers: usize,
        window: usize,
        ceiling: u32,
    ) -> (Dispatcher, BlockingQueue<String>, Vec<BlockingQueue<String>>) {
        let allowed = BlockingQueue::new();
        let outputs: Vec<_> = (0..workers).map(|_| BlockingQueue::new()).collect();
        let dispatcher = Dispatcher::new(
            allowed.clone(),
            outputs.clone(),
            window,
            ceiling,
            Arc::new(CrawlCounters::new()),
        );
        (dispatcher, allowed, outputs)
    }

    #[test]
    fn test_round_robin_assignment() {
        let (mut d, _, outputs) = dispatcher(3, 100, 100);

        for i in 0..7 {
            assert!(d.dispatch(format!("http://h{}.example/", i)));
        }

        let depths: Vec<_> = outputs.iter().map(|q| q.len()).collect();
        assert_eq!(depths, vec![3, 2, 2]);
        assert_eq!(outputs[0].try_pop().unwrap(), "http://h0.example/");
        assert_eq!(outputs[1].try_pop().unwrap(), "http://h1.example/");
    }

    #[test]
    fn test_saturated_host_requeued() {
        let (mut d, allowed, outputs) = dispatcher(2, 100, 2);

        assert!(d.dispatch("http://busy.example/1".to_string()));
        assert!(d.dispatch("http://busy.example/2".to_string()));
        assert!(!d.dispatch("http://busy.example/3".to_string()));
        assert!(d.dispatch("http://quiet.example/1".to_string()));

        assert_eq!(allowed.try_pop().unwrap(), "http://busy.example/3");
        assert_eq!(outputs.iter().map(|q| q.len()).sum::<usize>(), 3);
        assert_eq!(CrawlCounters::get(&d.counters.requeued), 1);
    }

    #[test]
    fn test_requeued_host_dispatched_after_window() {
        let (mut d, allowed, _) = dispatcher(1, 4, 1);

        assert!(d.dispatch("http://busy.example/1".to_string()));

        let mut attempts = 0;
        let mut url = "http://busy.example/2".to_string();
        while !d.dispatch(url) {
            attempts += 1;
            assert!(attempts < 20, "window never reset");
            url = allowed.try_pop().unwrap();
        }
        assert!(attempts > 0);
    }

    #[test]
    fn test_hostless_url_dropped() {
        let (mut d, allowed, outputs) = dispatcher(1, 10, 10);

        assert!(!d.dispatch("/relative".to_string()));
        assert!(allowed.is_empty());
        assert!(outputs[0].is_empty());
    }

    #[test]
    fn test_hosts_counted_by_scheme_and_authority() {
        let (mut d, _, _) = dispatcher(1, 100, 1);

        assert!(d.dispatch("http://example.com/a".to_string()));
        assert!(d.dispatch("https://example.com/a".to_string()));
        assert!(d.dispatch("http://example.com:8080/a".to_string()));
        assert!(!d.dispatch("http://EXAMPLE.com/b".to_string()));
    }

    #[test]
    fn test_run_stops_on_flag() {
        let (d, allowed, outputs) = dispatcher(1, 10, 10);
        let running = Arc::new(AtomicBool::new(true));
        allowed.push("http://example.com/".to_string());

        let handle = {
            let running = Arc::clone(&running);
            thread::spawn(move || d.run(running, Duration::from_millis(5)))
        };

        let popped = outputs[0].pop_timeout(Duration::from_secs(2));
        running.store(false, Ordering::Release);
        handle.join().unwrap();

        assert_eq!(popped.as_deref(), Some("http://example.com/"));
    }
}
