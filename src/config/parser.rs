use crate::config::types::Config;
use crate::config::validation::validate;
use crate::url::UrlRef;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use tidemark::config::load_config;
///
/// let config = load_config(Path::new("tidemark.toml")).unwrap();
/// println!("Fetch workers: {}", config.crawler.fetchers);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a metrics file can be tied to the exact settings
/// that produced it.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Loads a configuration together with the hash of the text it came from
///
/// The file is read once, so the hash always matches the parsed settings.
///
/// # Returns
///
/// * `Ok((Config, String))` - Validated configuration and its hex hash
/// * `Err(ConfigError)` - Failed to read, parse or validate the file
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

/// Reads a seed list: URLs separated by any whitespace
///
/// Lines starting with `#` are comments.
///
/// # Arguments
///
/// * `path` - Path to the seed file
///
/// # Returns
///
/// * `Ok(Vec<UrlRef>)` - The seeds, in file order
/// * `Err(ConfigError)` - The file could not be read, a seed is not a
///   complete `http`/`https` URL, or the list is empty
pub fn load_seeds(path: &Path) -> Result<Vec<UrlRef>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_seeds(&content)
}

/// Parses seed list content; see [`load_seeds`]
pub fn parse_seeds(content: &str) -> Result<Vec<UrlRef>, ConfigError> {
    let mut seeds = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        for token in line.split_whitespace() {
            let seed = UrlRef::try_parse(token).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", token, e))
            })?;
            seeds.push(seed);
        }
    }

    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "Seed list must contain at least one URL".to_string(),
        ));
    }

    Ok(seeds)
}
