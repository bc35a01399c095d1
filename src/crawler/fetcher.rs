//! Fetcher workers (§4.E): acquire a URL from the frontier, honour
//! politeness, perform the HTTP GET, filter the response, and hand text off
//! to the parse queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::crawler::types::{FetchedPage, PendingCounter};
use crate::errorlog::ErrorLog;
use crate::frontier::Frontier;
use crate::governor::{parse_retry_after, RateLimitGovernor};
use crate::robots::RobotsCache;
use crate::url::extract_host;

/// Response body size above which a page is rejected unread, per §6.
const MAX_CONTENT_LENGTH: u64 = 5 * 1024 * 1024;

/// Builds the shared HTTP client used by every fetcher worker: one client,
/// one connection pool, capped per host at `max_connections_per_host`.
pub fn build_http_client(
    user_agent: &str,
    max_connections_per_host: usize,
) -> reqwest::Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("max-age=0"),
    );

    Client::builder()
        .user_agent(user_agent.to_string())
        .default_headers(headers)
        .pool_max_idle_per_host(max_connections_per_host)
        .build()
}

/// Shared dependencies a fetcher worker needs, grouped so `run` stays
/// readable with one parameter instead of eight.
pub struct FetcherContext {
    pub frontier: Arc<Frontier>,
    pub robots: Arc<RobotsCache>,
    pub governor: Arc<RateLimitGovernor>,
    pub client: Client,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub parse_tx: mpsc::Sender<FetchedPage>,
    pub parse_pending: Arc<PendingCounter>,
    pub crawled: Arc<AtomicU64>,
    pub error_log: Arc<ErrorLog>,
    pub cancel: CancellationToken,
}

/// Runs one fetcher worker until cancelled. Every dequeued URL is marked
/// done exactly once, at the end of the loop body, regardless of which
/// branch handled it (§9 Open Question: no double `task_done`).
pub async fn run(ctx: FetcherContext) {
    loop {
        let entry = tokio::select! {
            _ = ctx.cancel.cancelled() => return,
            entry = ctx.frontier.get() => entry,
        };

        handle_one(&ctx, &entry.url, &entry.reg_domain).await;
        ctx.frontier.task_done();
    }
}

/// `crawled` is incremented only once a URL has passed the robots gate
/// (§4.E step 2 marks a robots-denied URL done without counting it as an
/// attempt); everything from here on — transport failures, content-type
/// rejections, body-read errors — still counts as one attempt against
/// `max_crawl`, matching the original's `self.crawled += 1` placement.
async fn handle_one(ctx: &FetcherContext, url_str: &str, reg_domain: &str) {
    let Ok(url) = Url::parse(url_str) else {
        return;
    };
    let Some(host) = extract_host(&url) else {
        return;
    };

    let rule = ctx.robots.check(&host).await;
    let allowed = rule.as_ref().map(|r| r.can_fetch(&url)).unwrap_or(true);
    if !allowed {
        return;
    }

    ctx.crawled.fetch_add(1, Ordering::SeqCst);

    let lock = ctx.governor.lock_for(reg_domain).await;
    let _guard = lock.lock().await;

    ctx.governor.sleep_until_allowed(reg_domain).await;

    let response = ctx
        .client
        .get(url.as_str())
        .timeout(ctx.request_timeout)
        .send()
        .await;

    let response = match response {
        Ok(resp) => resp,
        Err(err) => {
            ctx.error_log
                .record("fetcher::handle_one", "transport error", &format!("url={url_str} err={err}"))
                .await;
            ctx.governor
                .record_after_response(reg_domain, None, None, rule.as_ref())
                .await;
            return;
        }
    };

    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);

    ctx.governor
        .record_after_response(reg_domain, Some(status), retry_after, rule.as_ref())
        .await;

    if !accepted(&response) {
        return;
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            ctx.error_log
                .record("fetcher::handle_one", "body read error", &format!("url={url_str} err={err}"))
                .await;
            return;
        }
    };

    let html = body.replace('\0', "");
    let fetched = FetchedPage {
        url: url_str.to_string(),
        html,
    };

    ctx.parse_pending.incr();
    if ctx.parse_tx.send(fetched).await.is_err() {
        // Receiver gone: the parser side has already shut down.
        ctx.parse_pending.decr();
    }
}

/// Response-classification gate (§6): accept iff `Content-Type` is absent or
/// contains `text/html`, `Content-Language` is absent or contains `en`, and
/// `Content-Length` is absent or at most 5 MiB.
fn accepted(response: &reqwest::Response) -> bool {
    if !response.status().is_success() {
        return false;
    }

    if let Some(len) = response.content_length() {
        if len > MAX_CONTENT_LENGTH {
            return false;
        }
    }

    if let Some(content_type) = response.headers().get(header::CONTENT_TYPE) {
        if let Ok(value) = content_type.to_str() {
            if !value.to_ascii_lowercase().contains("text/html") {
                return false;
            }
        }
    }

    if let Some(content_language) = response.headers().get(header::CONTENT_LANGUAGE) {
        if let Ok(value) = content_language.to_str() {
            if !value.to_ascii_lowercase().contains("en") {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client_with_user_agent() {
        let client = build_http_client("TestBot/1.0", 60);
        assert!(client.is_ok());
    }
}
