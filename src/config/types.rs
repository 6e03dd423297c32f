use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Tidemark
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Pipeline sizing and politeness configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of fetch worker threads (one input queue each)
    #[serde(default = "default_fetchers")]
    pub fetchers: usize,

    /// Number of HTML extraction worker threads
    #[serde(default = "default_parsers")]
    pub parsers: usize,

    /// Ceiling on bytes buffered across all queues
    #[serde(rename = "byte-budget", default = "default_byte_budget")]
    pub byte_budget: u64,

    /// Number of hosts whose robots policy is kept in memory
    #[serde(rename = "robots-cache-capacity", default = "default_robots_cache_capacity")]
    pub robots_cache_capacity: usize,

    /// Dispatches allowed per host within one window
    #[serde(rename = "host-rate-limit", default = "default_host_rate_limit")]
    pub host_rate_limit: u32,

    /// Window length in dispatch decisions, also the size of the host history
    #[serde(rename = "host-window", default = "default_host_window")]
    pub host_window: usize,

    /// Timeout for a page fetch (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Timeout for a robots.txt fetch (seconds)
    #[serde(rename = "robots-timeout-secs", default = "default_robots_timeout_secs")]
    pub robots_timeout_secs: u64,

    /// How long a stage waits on an empty queue before re-checking shutdown
    #[serde(rename = "pop-timeout-ms", default = "default_pop_timeout_ms")]
    pub pop_timeout_ms: u64,

    /// Stop after this many fetches; 0 means run until interrupted
    #[serde(rename = "max-pages", default)]
    pub max_pages: u64,
}

fn default_fetchers() -> usize {
    8
}

fn default_parsers() -> usize {
    2
}

fn default_byte_budget() -> u64 {
    1 << 30
}

fn default_robots_cache_capacity() -> usize {
    100_000
}

fn default_host_rate_limit() -> u32 {
    10
}

fn default_host_window() -> usize {
    1000
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_robots_timeout_secs() -> u64 {
    10
}

fn default_pop_timeout_ms() -> u64 {
    100
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            fetchers: default_fetchers(),
            parsers: default_parsers(),
            byte_budget: default_byte_budget(),
            robots_cache_capacity: default_robots_cache_capacity(),
            host_rate_limit: default_host_rate_limit(),
            host_window: default_host_window(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            robots_timeout_secs: default_robots_timeout_secs(),
            pop_timeout_ms: default_pop_timeout_ms(),
            max_pages: 0,
        }
    }
}

impl CrawlerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_timeout_secs)
    }

    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the token matched in robots.txt
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// The header value sent with every request
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn full_user_agent(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// File the periodic metrics lines are appended to; log only when unset
    #[serde(rename = "metrics-path", default)]
    pub metrics_path: Option<String>,

    /// Seconds between metrics lines
    #[serde(rename = "metrics-interval-secs", default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval_secs() -> u64 {
    2
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            metrics_path: None,
            metrics_interval_secs: default_metrics_interval_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "Tidemark".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_full_user_agent() {
        assert_eq!(
            user_agent().full_user_agent(),
            "Tidemark/1.0 (+https://example.com/about; admin@example.com)"
        );
    }

    #[test]
    fn test_crawler_defaults() {
        let crawler = CrawlerConfig::default();
        assert_eq!(crawler.fetchers, 8);
        assert_eq!(crawler.parsers, 2);
        assert_eq!(crawler.byte_budget, 1024 * 1024 * 1024);
        assert_eq!(crawler.robots_cache_capacity, 100_000);
        assert_eq!(crawler.host_rate_limit, 10);
        assert_eq!(crawler.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(crawler.pop_timeout(), Duration::from_millis(100));
        assert_eq!(crawler.max_pages, 0);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[user-agent]
crawler-name = "Tidemark"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"
"#,
        )
        .unwrap();

        assert_eq!(config.crawler.fetchers, 8);
        assert_eq!(config.output.metrics_interval_secs, 2);
        assert!(config.output.metrics_path.is_none());
    }

    #[test]
    fn test_partial_crawler_section() {
        let config: Config = toml::from_str(
            r#"
[crawler]
fetchers = 3
byte-budget = 4096

[user-agent]
crawler-name = "Tidemark"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"
"#,
        )
        .unwrap();

        assert_eq!(config.crawler.fetchers, 3);
        assert_eq!(config.crawler.byte_budget, 4096);
        assert_eq!(config.crawler.parsers, 2);
    }
}
