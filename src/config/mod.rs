//! Configuration module for Tidemark
//!
//! This module handles loading, parsing, and validating the TOML
//! configuration file and the seed list.
//!
//! # Example
//!
//! ```no_run
//! use tidemark::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tidemark.toml")).unwrap();
//! println!("Byte budget: {}", config.crawler.byte_budget);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, load_seeds, parse_config, parse_seeds,
};
