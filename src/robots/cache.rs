//! Per-host robots.txt cache.
//!
//! Unlike a typical HTTP cache, entries here — including negative ones for
//! hosts with no reachable `robots.txt` — are never evicted during a run.
//! A crawl is bounded and short-lived enough that staleness isn't a concern,
//! and re-fetching on every politeness decision would itself be impolite.

use std::collections::HashMap;

use tokio::sync::Mutex;
use url::Url;

use crate::robots::ParsedRobots;

/// The politeness-relevant contents of a host's `robots.txt`.
#[derive(Debug, Clone)]
pub struct RobotsRule {
    parser: ParsedRobots,
    crawl_delay_seconds: Option<f64>,
    request_interval_seconds: Option<f64>,
}

impl RobotsRule {
    pub(crate) fn from_content(content: &str, user_agent: &str) -> Self {
        let parser = ParsedRobots::from_content(content);
        let crawl_delay_seconds = parser.crawl_delay(user_agent);
        let request_interval_seconds = parser.request_rate(user_agent);
        Self {
            parser,
            crawl_delay_seconds,
            request_interval_seconds,
        }
    }

    /// Whether `url` may be fetched under this rule.
    ///
    /// Always evaluated against the wildcard (`*`) group, per §4.C and the
    /// original implementation's `can_fetch("*", url)` — a crawler-specific
    /// `User-agent:` group still applies to `crawl_delay`/`request_interval`
    /// (via `from_content`'s own `user_agent` parameter), but allow/disallow
    /// decisions are always the wildcard group's.
    pub fn can_fetch(&self, url: &Url) -> bool {
        let path = if url.query().is_some() {
            format!("{}?{}", url.path(), url.query().unwrap_or_default())
        } else {
            url.path().to_string()
        };
        self.parser.is_allowed(&path, "*")
    }

    /// The declared `Crawl-delay`, in seconds, if any.
    pub fn crawl_delay(&self) -> Option<f64> {
        self.crawl_delay_seconds
    }

    /// The declared `Request-rate`, expressed as seconds-per-request, if any.
    pub fn request_interval(&self) -> Option<f64> {
        self.request_interval_seconds
    }
}

/// Process-wide cache of parsed robots.txt rules, keyed by scheme-qualified host.
pub struct RobotsCache {
    client: reqwest::Client,
    user_agent: String,
    entries: Mutex<HashMap<String, Option<RobotsRule>>>,
}

impl RobotsCache {
    /// Builds an empty cache backed by `client`, using `user_agent` both for
    /// the `robots.txt` fetch and for evaluating its directives.
    pub fn new(client: reqwest::Client, user_agent: String) -> Self {
        Self {
            client,
            user_agent,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached rule for `host`, fetching and parsing
    /// `{host}/robots.txt` on first access. `None` means "no restrictions" —
    /// either the cache recorded a negative entry or the fetch genuinely
    /// found no restrictions.
    pub async fn check(&self, host: &str) -> Option<RobotsRule> {
        {
            let entries = self.entries.lock().await;
            if let Some(cached) = entries.get(host) {
                return cached.clone();
            }
        }

        let rule = self.fetch(host).await;

        let mut entries = self.entries.lock().await;
        entries
            .entry(host.to_string())
            .or_insert(rule)
            .clone()
    }

    async fn fetch(&self, host: &str) -> Option<RobotsRule> {
        let robots_url = format!("{host}/robots.txt");

        let response = match self.client.get(&robots_url).send().await {
            Ok(resp) => resp,
            Err(_) => return None,
        };

        if !response.status().is_success() {
            return None;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(_) => return None,
        };

        if body.trim().is_empty() {
            return None;
        }

        Some(RobotsRule::from_content(&body, &self.user_agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> reqwest::Client {
        reqwest::Client::new()
    }

    #[test]
    fn disallow_rule_blocks_matching_path() {
        let rule = RobotsRule::from_content("User-agent: *\nDisallow: /private", "TestBot");
        let url = Url::parse("https://example.com/private/page").unwrap();
        assert!(!rule.can_fetch(&url));
    }

    #[test]
    fn allow_rule_permits_other_paths() {
        let rule = RobotsRule::from_content("User-agent: *\nDisallow: /private", "TestBot");
        let url = Url::parse("https://example.com/public").unwrap();
        assert!(rule.can_fetch(&url));
    }

    #[test]
    fn can_fetch_always_uses_wildcard_group_even_when_crawler_specific_group_denies() {
        let rule = RobotsRule::from_content(
            "User-agent: TestBot\nDisallow: /\n\nUser-agent: *\nAllow: /",
            "TestBot",
        );
        let url = Url::parse("https://example.com/page").unwrap();
        assert!(rule.can_fetch(&url));
    }

    #[test]
    fn crawl_delay_is_extracted_at_construction() {
        let rule = RobotsRule::from_content("User-agent: *\nCrawl-delay: 3", "TestBot");
        assert_eq!(rule.crawl_delay(), Some(3.0));
    }

    #[tokio::test]
    async fn cache_returns_none_for_unreachable_host() {
        let cache = RobotsCache::new(client(), "TestBot".to_string());
        let rule = cache.check("http://127.0.0.1:1").await;
        assert!(rule.is_none());
    }

    #[tokio::test]
    async fn cache_stores_negative_entries() {
        let cache = RobotsCache::new(client(), "TestBot".to_string());
        let first = cache.check("http://127.0.0.1:1").await;
        let second = cache.check("http://127.0.0.1:1").await;
        assert!(first.is_none());
        assert!(second.is_none());
        assert_eq!(cache.entries.lock().await.len(), 1);
    }
}
