//! Per-registrable-domain politeness: a next-allowed-fetch clock and a
//! serialising lock, so that at most one fetch to a given domain is ever in
//! flight and consecutive fetches respect whatever wait the last response
//! demanded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use tokio::sync::Mutex;

use crate::robots::RobotsRule;

/// A parsed `Retry-After` header value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryAfter {
    Seconds(u64),
    HttpDate(DateTime<Utc>),
}

/// Parses a `Retry-After` header value, accepting either a delta-seconds
/// integer or an HTTP-date.
pub fn parse_retry_after(value: &str) -> Option<RetryAfter> {
    let trimmed = value.trim();
    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Some(RetryAfter::Seconds(seconds));
    }
    DateTime::parse_from_rfc2822(trimmed)
        .ok()
        .map(|dt| RetryAfter::HttpDate(dt.with_timezone(&Utc)))
}

const MIN_SLEEP: StdDuration = StdDuration::from_millis(50);
const DEFAULT_WAIT_MS: i64 = 200;
const THROTTLED_FALLBACK_SECONDS: i64 = 15;
const MIN_ROBOTS_WAIT_SECONDS: f64 = 0.2;
const RETRY_AFTER_MAX_CLAMP_SECONDS: i64 = 3600;

/// Per-domain next-allowed-fetch times and serialising locks, shared across
/// all fetcher workers.
pub struct RateLimitGovernor {
    wait_until: Mutex<HashMap<String, DateTime<Utc>>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RateLimitGovernor {
    pub fn new() -> Self {
        Self {
            wait_until: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the lock for `reg_domain`, creating it atomically if this is
    /// the first request seen for that domain.
    pub async fn lock_for(&self, reg_domain: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(reg_domain.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Sleeps until `reg_domain`'s next-allowed instant, if that instant is
    /// more than 50ms away. Must be called while holding that domain's lock.
    pub async fn sleep_until_allowed(&self, reg_domain: &str) {
        let until = {
            let map = self.wait_until.lock().await;
            map.get(reg_domain).copied()
        };

        let Some(until) = until else { return };
        let now = Utc::now();
        if until <= now {
            return;
        }

        let remaining = (until - now)
            .to_std()
            .unwrap_or(StdDuration::ZERO);
        if remaining > MIN_SLEEP {
            tokio::time::sleep(remaining).await;
        }
    }

    /// Records the next-allowed instant for `reg_domain` after a completed
    /// fetch, in priority order: server-driven throttling, then robots
    /// directives, then the default interval. Must be called while holding
    /// that domain's lock.
    pub async fn record_after_response(
        &self,
        reg_domain: &str,
        status: Option<StatusCode>,
        retry_after: Option<RetryAfter>,
        rule: Option<&RobotsRule>,
    ) {
        let now = Utc::now();
        let next = if is_throttled(status) {
            next_allowed_for_throttle(now, retry_after)
        } else if let Some(wait_seconds) = robots_wait_seconds(rule) {
            now + Duration::milliseconds((wait_seconds * 1000.0) as i64)
        } else {
            now + Duration::milliseconds(DEFAULT_WAIT_MS)
        };

        let mut map = self.wait_until.lock().await;
        map.insert(reg_domain.to_string(), next);
    }
}

impl Default for RateLimitGovernor {
    fn default() -> Self {
        Self::new()
    }
}

fn is_throttled(status: Option<StatusCode>) -> bool {
    matches!(status, Some(s) if s == StatusCode::TOO_MANY_REQUESTS || s == StatusCode::SERVICE_UNAVAILABLE)
}

fn next_allowed_for_throttle(now: DateTime<Utc>, retry_after: Option<RetryAfter>) -> DateTime<Utc> {
    match retry_after {
        Some(RetryAfter::Seconds(n)) => now + Duration::seconds(n as i64),
        Some(RetryAfter::HttpDate(at)) => {
            let clamp = now + Duration::seconds(RETRY_AFTER_MAX_CLAMP_SECONDS);
            at.clamp(now, clamp)
        }
        None => now + Duration::seconds(THROTTLED_FALLBACK_SECONDS),
    }
}

fn robots_wait_seconds(rule: Option<&RobotsRule>) -> Option<f64> {
    let rule = rule?;
    let crawl_delay = rule.crawl_delay();
    let request_interval = rule.request_interval();
    if crawl_delay.is_none() && request_interval.is_none() {
        return None;
    }
    let wait = crawl_delay
        .unwrap_or(0.0)
        .max(request_interval.unwrap_or(0.0))
        .max(MIN_ROBOTS_WAIT_SECONDS);
    Some(wait)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_retry_after() {
        assert_eq!(parse_retry_after("120"), Some(RetryAfter::Seconds(120)));
    }

    #[test]
    fn parses_http_date_retry_after() {
        let parsed = parse_retry_after("Wed, 21 Oct 2099 07:28:00 GMT");
        assert!(matches!(parsed, Some(RetryAfter::HttpDate(_))));
    }

    #[test]
    fn malformed_retry_after_is_none() {
        assert_eq!(parse_retry_after("not-a-value"), None);
    }

    #[tokio::test]
    async fn default_wait_is_two_hundred_ms() {
        let governor = RateLimitGovernor::new();
        let before = Utc::now();
        governor
            .record_after_response("example.com", Some(StatusCode::OK), None, None)
            .await;
        let map = governor.wait_until.lock().await;
        let next = *map.get("example.com").unwrap();
        assert!(next >= before + Duration::milliseconds(199));
        assert!(next <= before + Duration::milliseconds(400));
    }

    #[tokio::test]
    async fn retry_after_zero_means_wait_until_now() {
        let governor = RateLimitGovernor::new();
        let before = Utc::now();
        governor
            .record_after_response(
                "example.com",
                Some(StatusCode::TOO_MANY_REQUESTS),
                Some(RetryAfter::Seconds(0)),
                None,
            )
            .await;
        let map = governor.wait_until.lock().await;
        let next = *map.get("example.com").unwrap();
        assert!(next >= before && next <= before + Duration::milliseconds(50));
    }

    #[tokio::test]
    async fn missing_retry_after_falls_back_to_fifteen_seconds() {
        let governor = RateLimitGovernor::new();
        let before = Utc::now();
        governor
            .record_after_response("example.com", Some(StatusCode::SERVICE_UNAVAILABLE), None, None)
            .await;
        let map = governor.wait_until.lock().await;
        let next = *map.get("example.com").unwrap();
        assert!(next >= before + Duration::seconds(14));
        assert!(next <= before + Duration::seconds(16));
    }

    #[tokio::test]
    async fn http_date_retry_after_clamped_to_one_hour() {
        let governor = RateLimitGovernor::new();
        let before = Utc::now();
        let far_future = before + Duration::days(2);
        let header = far_future.to_rfc2822();
        governor
            .record_after_response(
                "example.com",
                Some(StatusCode::TOO_MANY_REQUESTS),
                parse_retry_after(&header),
                None,
            )
            .await;
        let map = governor.wait_until.lock().await;
        let next = *map.get("example.com").unwrap();
        assert!(next <= before + Duration::seconds(RETRY_AFTER_MAX_CLAMP_SECONDS + 1));
    }

    #[tokio::test]
    async fn robots_crawl_delay_floor_is_two_hundred_ms() {
        let rule = RobotsRule::from_content("User-agent: *\nCrawl-delay: 0.05", "TestBot");
        let governor = RateLimitGovernor::new();
        let before = Utc::now();
        governor
            .record_after_response("example.com", Some(StatusCode::OK), None, Some(&rule))
            .await;
        let map = governor.wait_until.lock().await;
        let next = *map.get("example.com").unwrap();
        assert!(next >= before + Duration::milliseconds(199));
    }

    #[tokio::test]
    async fn lock_for_returns_same_arc_for_same_domain() {
        let governor = RateLimitGovernor::new();
        let a = governor.lock_for("example.com").await;
        let b = governor.lock_for("example.com").await;
        assert!(Arc::ptr_eq(&a, &b));
    }
}
