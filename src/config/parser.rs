use std::path::Path;

use sha2::{Digest, Sha256};

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;

/// Loads and validates a `crawl.toml` configuration file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the raw configuration file content, used to
/// record run provenance in logs.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns it alongside its content hash.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[crawl]
seeds = ["https://example.com/"]
fetcher-workers = 10
parser-workers = 5
persistence-workers = 5
request-timeout-secs = 8
max-connections-per-host = 60
max-crawl = 1000

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"
"#;

    #[test]
    fn loads_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawl.seeds, vec!["https://example.com/".to_string()]);
        assert_eq!(config.crawl.max_crawl, 1000);
        assert_eq!(config.user_agent.crawler_name, "TestCrawler");
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = load_config(Path::new("/nonexistent/crawl.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn validation_failure_surfaces_as_validation_error() {
        let content = VALID_CONFIG.replace("max-crawl = 1000", "max-crawl = 0");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn hash_is_stable_for_same_content() {
        let file = create_temp_config(VALID_CONFIG);
        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_content() {
        let file1 = create_temp_config(VALID_CONFIG);
        let file2 = create_temp_config(&VALID_CONFIG.replace("1000", "2000"));
        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn load_config_with_hash_returns_both() {
        let file = create_temp_config(VALID_CONFIG);
        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(config.crawl.max_crawl, 1000);
        assert_eq!(hash.len(), 64);
    }
}
