use serde::Deserialize;

/// Top-level crawl configuration, loaded from a `crawl.toml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Pipeline sizing and politeness knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// URLs the frontier is seeded with at startup.
    pub seeds: Vec<String>,

    /// Number of fetcher workers.
    #[serde(rename = "fetcher-workers", default = "default_fetcher_workers")]
    pub fetcher_workers: u32,

    /// Number of parser workers.
    #[serde(rename = "parser-workers", default = "default_parser_workers")]
    pub parser_workers: u32,

    /// Number of persistence workers.
    #[serde(rename = "persistence-workers", default = "default_persistence_workers")]
    pub persistence_workers: u32,

    /// Total request timeout, in seconds.
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Per-host connection cap for the shared HTTP client.
    #[serde(
        rename = "max-connections-per-host",
        default = "default_max_connections_per_host"
    )]
    pub max_connections_per_host: u32,

    /// Crawl stops accepting new attempts once this many URLs have been attempted.
    #[serde(rename = "max-crawl")]
    pub max_crawl: u64,
}

fn default_fetcher_workers() -> u32 {
    32
}

fn default_parser_workers() -> u32 {
    5
}

fn default_persistence_workers() -> u32 {
    5
}

fn default_request_timeout_secs() -> u64 {
    8
}

fn default_max_connections_per_host() -> u32 {
    60
}

/// Identity the crawler presents in its `User-Agent` header and in
/// robots.txt group matching.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// The literal string sent as `User-Agent` and matched against robots.txt groups.
    pub fn identity(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}
