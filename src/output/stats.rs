//! Crawl counters and point-in-time pipeline snapshots
//!
//! Counters are shared by every stage and updated with relaxed atomics; a
//! [`PipelineSnapshot`] reads them together with queue depths and budget
//! usage for the periodic metrics line and the final summary.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative counters updated by the pipeline stages
#[derive(Debug, Default)]
pub struct CrawlCounters {
    /// Pages handed back by fetch workers (any status)
    pub fetched: AtomicU64,
    /// Pages processed by extraction workers
    pub parsed: AtomicU64,
    /// URLs admitted by the frontier
    pub admitted: AtomicU64,
    /// URLs rejected by robots rules or an unusable host
    pub discarded: AtomicU64,
    /// URLs the dispatcher put back because their host was saturated
    pub requeued: AtomicU64,
    /// Frontier gauge: URLs waiting on a robots decision
    pub pending: AtomicU64,
    /// Frontier gauge: URLs marked visited
    pub visited: AtomicU64,
    /// Items popped by a stage and not yet handed to the next one
    pub active: AtomicU64,
}

impl CrawlCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn decr(counter: &AtomicU64) {
        counter.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn set(gauge: &AtomicU64, value: u64) {
        gauge.store(value, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Queue depths, counters and budget usage at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub taken_at: DateTime<Utc>,
    /// URLs waiting in the fetch worker queues
    pub urls_queued: u64,
    /// URLs admitted by the frontier, not yet dispatched
    pub allowed_queued: u64,
    /// Fetched pages waiting for extraction
    pub contents_queued: u64,
    /// Extracted pages waiting for the frontier
    pub parsed_queued: u64,
    pub fetched: u64,
    pub parsed: u64,
    pub admitted: u64,
    pub discarded: u64,
    pub requeued: u64,
    pub pending: u64,
    pub visited: u64,
    pub active: u64,
    pub bytes_held: u64,
    pub byte_budget: u64,
}

impl PipelineSnapshot {
    /// Header line written at the top of a metrics file
    pub const HEADER: &'static str = "# time urls allowed contents parsed fetched parsed_pages bytes";

    /// True if no stage holds or is waiting to process any work
    ///
    /// The fields are read one after another, so a single idle snapshot can
    /// be a false positive; callers should see two in a row.
    pub fn is_idle(&self) -> bool {
        self.urls_queued == 0
            && self.allowed_queued == 0
            && self.contents_queued == 0
            && self.parsed_queued == 0
            && self.pending == 0
            && self.active == 0
    }

    /// Share of the byte budget in use, as a percentage
    pub fn budget_used_percent(&self) -> f64 {
        if self.byte_budget == 0 {
            return 0.0;
        }
        (self.bytes_held as f64 / self.byte_budget as f64) * 100.0
    }
}

impl fmt::Display for PipelineSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {}",
            self.taken_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.urls_queued,
            self.allowed_queued,
            self.contents_queued,
            self.parsed_queued,
            self.fetched,
            self.parsed,
            self.bytes_held
        )
    }
}

/// Prints the end-of-crawl summary to stdout
pub fn print_summary(snapshot: &PipelineSnapshot, elapsed_secs: f64) {
    println!("=== Crawl Summary ===\n");

    println!("Pages:");
    println!("  Fetched: {}", snapshot.fetched);
    println!("  Parsed: {}", snapshot.parsed);
    println!("  Visited: {}", snapshot.visited);
    println!();

    println!("Frontier:");
    println!("  Admitted: {}", snapshot.admitted);
    println!("  Discarded by robots: {}", snapshot.discarded);
    println!("  Still pending: {}", snapshot.pending);
    println!("  Rate-limit requeues: {}", snapshot.requeued);
    println!();

    println!(
        "Memory: {} of {} bytes held ({:.1}%)",
        snapshot.bytes_held,
        snapshot.byte_budget,
        snapshot.budget_used_percent()
    );

    let rate = if elapsed_secs > 0.0 {
        snapshot.fetched as f64 / elapsed_secs
    } else {
        0.0
    };
    println!("Throughput: {:.2} pages/sec over {:.1}s", rate, elapsed_secs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot() -> PipelineSnapshot {
        PipelineSnapshot {
            taken_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            urls_queued: 12,
            allowed_queued: 3,
            contents_queued: 4,
            parsed_queued: 1,
            fetched: 100,
            parsed: 97,
            admitted: 140,
            discarded: 9,
            requeued: 2,
            pending: 30,
            visited: 99,
            active: 1,
            bytes_held: 2048,
            byte_budget: 8192,
        }
    }

    #[test]
    fn test_metrics_line_format() {
        assert_eq!(
            snapshot().to_string(),
            "2024-05-01T12:30:00Z 12 3 4 1 100 97 2048"
        );
    }

    #[test]
    fn test_header_matches_columns() {
        let columns = PipelineSnapshot::HEADER.trim_start_matches("# ").split(' ').count();
        assert_eq!(columns, snapshot().to_string().split(' ').count());
    }

    #[test]
    fn test_idle_requires_empty_pipeline() {
        let mut snap = snapshot();
        assert!(!snap.is_idle());

        snap.urls_queued = 0;
        snap.allowed_queued = 0;
        snap.contents_queued = 0;
        snap.parsed_queued = 0;
        snap.pending = 0;
        assert!(!snap.is_idle());

        snap.active = 0;
        assert!(snap.is_idle());
    }

    #[test]
    fn test_budget_percent() {
        assert!((snapshot().budget_used_percent() - 25.0).abs() < f64::EPSILON);

        let mut empty = snapshot();
        empty.byte_budget = 0;
        assert_eq!(empty.budget_used_percent(), 0.0);
    }

    #[test]
    fn test_counters() {
        let counters = CrawlCounters::new();
        CrawlCounters::incr(&counters.fetched);
        CrawlCounters::incr(&counters.fetched);
        CrawlCounters::add(&counters.admitted, 5);
        CrawlCounters::set(&counters.pending, 7);
        CrawlCounters::set(&counters.pending, 3);
        CrawlCounters::incr(&counters.active);
        CrawlCounters::decr(&counters.active);

        assert_eq!(CrawlCounters::get(&counters.fetched), 2);
        assert_eq!(CrawlCounters::get(&counters.admitted), 5);
        assert_eq!(CrawlCounters::get(&counters.pending), 3);
        assert_eq!(CrawlCounters::get(&counters.active), 0);
    }
}
