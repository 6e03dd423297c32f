//! Output module for crawl metrics
//!
//! This module handles:
//! - Counters shared by the pipeline stages
//! - Periodic pipeline snapshots, logged or appended to a metrics file
//! - The end-of-crawl summary

mod metrics;
pub mod stats;

pub use metrics::MetricsLog;
pub use stats::{print_summary, CrawlCounters, PipelineSnapshot};
