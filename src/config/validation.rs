use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.fetchers < 1 || config.fetchers > 1024 {
        return Err(ConfigError::Validation(format!(
            "fetchers must be between 1 and 1024, got {}",
            config.fetchers
        )));
    }

    if config.parsers < 1 || config.parsers > 256 {
        return Err(ConfigError::Validation(format!(
            "parsers must be between 1 and 256, got {}",
            config.parsers
        )));
    }

    if config.byte_budget < 1024 {
        return Err(ConfigError::Validation(format!(
            "byte-budget must be >= 1024 bytes, got {}",
            config.byte_budget
        )));
    }

    if config.robots_cache_capacity < 1 {
        return Err(ConfigError::Validation(
            "robots-cache-capacity must be >= 1".to_string(),
        ));
    }

    if config.host_rate_limit < 1 {
        return Err(ConfigError::Validation(
            "host-rate-limit must be >= 1".to_string(),
        ));
    }

    if config.host_window < 1 {
        return Err(ConfigError::Validation(
            "host-window must be >= 1".to_string(),
        ));
    }

    if config.fetch_timeout_secs < 1 || config.robots_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got fetch {}s and robots {}s",
            config.fetch_timeout_secs, config.robots_timeout_secs
        )));
    }

    if config.pop_timeout_ms < 1 || config.pop_timeout_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "pop-timeout-ms must be between 1 and 60000, got {}",
            config.pop_timeout_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-version cannot be empty".to_string(),
        ));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if let Some(path) = &config.metrics_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "metrics-path cannot be empty when set".to_string(),
            ));
        }
    }

    if config.metrics_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "metrics-interval-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
