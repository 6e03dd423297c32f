//! Tidemark: a polite, memory-bounded web crawler
//!
//! Pages are fetched, their outbound links extracted and resolved, and the
//! links re-queued for fetching. Total buffered bytes stay under an operator
//! set ceiling, and every host is crawled no faster than its robots.txt and
//! an internal per-host rate limit allow.

pub mod config;
pub mod crawler;
pub mod output;
pub mod pipeline;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Tidemark operations
#[derive(Debug, Error)]
pub enum TidemarkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Wire format error: {0}")]
    Wire(#[from] WireError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Thread error: {0}")]
    Thread(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Malformed URL: {0}")]
    Malformed(String),

    #[error("URL is relative and cannot be used on its own: {0}")]
    Incomplete(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Errors raised while decoding an inter-stage message
#[derive(Debug, Error)]
pub enum WireError {
    #[error("Field {field} truncated: needed {needed} bytes, {available} available")]
    Truncated {
        field: usize,
        needed: usize,
        available: usize,
    },

    #[error("Field {field} is not valid UTF-8")]
    Utf8 { field: usize },

    #[error("{0} unexpected trailing bytes after the last field")]
    TrailingBytes(usize),
}

/// Result type alias for Tidemark operations
pub type Result<T> = std::result::Result<T, TidemarkError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Pipeline, PipelineHandle};
pub use pipeline::{BlockingQueue, ByteBudget};
pub use robots::{RobotsPolicy, RobotsStatus};
pub use url::UrlRef;
