use url::Url;

use crate::config::types::{Config, CrawlConfig, UserAgentConfig};
use crate::ConfigError;

/// Validates the entire configuration.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "seeds must contain at least one URL".to_string(),
        ));
    }

    for seed in &config.seeds {
        validate_seed_url(seed)?;
    }

    if config.fetcher_workers < 1 {
        return Err(ConfigError::Validation(format!(
            "fetcher-workers must be >= 1, got {}",
            config.fetcher_workers
        )));
    }

    if config.parser_workers < 1 {
        return Err(ConfigError::Validation(format!(
            "parser-workers must be >= 1, got {}",
            config.parser_workers
        )));
    }

    if config.persistence_workers < 1 {
        return Err(ConfigError::Validation(format!(
            "persistence-workers must be >= 1, got {}",
            config.persistence_workers
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be between 1 and 120, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_connections_per_host < 1 {
        return Err(ConfigError::Validation(format!(
            "max-connections-per-host must be >= 1, got {}",
            config.max_connections_per_host
        )));
    }

    if config.max_crawl < 1 {
        return Err(ConfigError::Validation(format!(
            "max-crawl must be >= 1, got {}",
            config.max_crawl
        )));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name must not be empty".to_string(),
        ));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-version must not be empty".to_string(),
        ));
    }

    validate_url(&config.contact_url, "contact-url")?;
    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_seed_url(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed).map_err(|_| ConfigError::InvalidUrl(seed.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(seed.to_string()));
    }
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(ConfigError::InvalidUrl(seed.to_string()));
    }
    Ok(())
}

fn validate_url(value: &str, field: &str) -> Result<(), ConfigError> {
    Url::parse(value).map_err(|_| ConfigError::InvalidUrl(format!("{field}: {value}")))?;
    Ok(())
}

fn validate_email(value: &str) -> Result<(), ConfigError> {
    let valid = value.contains('@') && !value.starts_with('@') && !value.ends_with('@');
    if !valid {
        return Err(ConfigError::Validation(format!(
            "contact-email is not a valid email address: {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            crawl: CrawlConfig {
                seeds: vec!["https://example.com/".to_string()],
                fetcher_workers: 10,
                parser_workers: 5,
                persistence_workers: 5,
                request_timeout_secs: 8,
                max_connections_per_host: 60,
                max_crawl: 1000,
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestBot".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
        }
    }

    #[test]
    fn accepts_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn rejects_empty_seeds() {
        let mut config = valid_config();
        config.crawl.seeds.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_non_http_seed() {
        let mut config = valid_config();
        config.crawl.seeds = vec!["ftp://example.com/".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_fetcher_workers() {
        let mut config = valid_config();
        config.crawl.fetcher_workers = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_max_crawl() {
        let mut config = valid_config();
        config.crawl.max_crawl = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_malformed_contact_email() {
        let mut config = valid_config();
        config.user_agent.contact_email = "not-an-email".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_blank_crawler_name() {
        let mut config = valid_config();
        config.user_agent.crawler_name = "  ".to_string();
        assert!(validate(&config).is_err());
    }
}
