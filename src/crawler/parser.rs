//! Parser workers (§4.F): extract outlinks and visible text from fetched
//! HTML, feeding the frontier and the persistence queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use scraper::{Html, Selector};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::crawler::types::{FetchedPage, ParsedPage, PendingCounter};
use crate::frontier::Frontier;
use crate::url::resolve_and_canonicalise;

/// The CPU-bound half of parsing: DOM construction, `<style>`/`<script>`
/// stripping, outlink resolution, and visible-text extraction. Run inside
/// `tokio::task::spawn_blocking` so the synchronous `scraper` tree-walk
/// never blocks the cooperative scheduler (§9 coroutine/CPU boundary).
fn extract(url: &str, html: &str) -> (String, Vec<String>) {
    let Ok(base) = Url::parse(url) else {
        return (String::new(), Vec::new());
    };

    let document = Html::parse_document(html);

    let mut outlinks = Vec::new();
    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() {
                continue;
            }
            if let Ok(resolved) = resolve_and_canonicalise(href, &base) {
                let scheme = resolved.scheme();
                if scheme == "https" || scheme == "http" {
                    outlinks.push(resolved.to_string());
                }
            }
        }
    }

    let skip: std::collections::HashSet<_> = match Selector::parse("style, script") {
        Ok(skip_selector) => document
            .select(&skip_selector)
            .flat_map(|el| el.descendants().map(|n| n.id()))
            .collect(),
        Err(_) => std::collections::HashSet::new(),
    };

    let mut text_parts = Vec::new();
    for node in document.tree.root().descendants() {
        if skip.contains(&node.id()) {
            continue;
        }
        if let Some(text) = node.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                text_parts.push(trimmed.to_string());
            }
        }
    }

    (text_parts.join(" "), outlinks)
}

/// Multiple parser workers share one receiver; `mpsc::Receiver` has a single
/// consumer, so the receiver itself is shared behind a lock instead.
pub type SharedParseRx = Arc<Mutex<mpsc::Receiver<FetchedPage>>>;

/// Decrements the shared parse-queue counter when a worker finishes handling
/// (or abandons) one item, regardless of which branch it exits through.
struct PendingGuard<'a>(&'a PendingCounter);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.decr();
    }
}

pub struct ParserContext {
    pub frontier: Arc<Frontier>,
    pub parse_rx: SharedParseRx,
    pub db_tx: mpsc::Sender<ParsedPage>,
    pub parse_pending: Arc<PendingCounter>,
    pub db_pending: Arc<PendingCounter>,
    pub adding_new_links: Arc<AtomicBool>,
    pub cancel: CancellationToken,
}

/// Runs one parser worker until its parse-queue channel closes or it's
/// cancelled. When `adding_new_links` has been cleared by the supervisor
/// (crawl budget reached), outlinks are still extracted but not enqueued to
/// the frontier — in-flight pages still finish persistence.
pub async fn run(ctx: ParserContext) {
    loop {
        let fetched = {
            let mut rx = ctx.parse_rx.lock().await;
            tokio::select! {
                _ = ctx.cancel.cancelled() => return,
                item = rx.recv() => item,
            }
        };
        let Some(fetched) = fetched else { return };

        let _guard = PendingGuard(&ctx.parse_pending);
        let url = fetched.url.replace('\0', "");
        let html = fetched.html;
        let (text, outlinks) = tokio::task::spawn_blocking(move || extract(&url, &html))
            .await
            .unwrap_or_default();
        let text = text.replace('\0', "");

        if ctx.adding_new_links.load(Ordering::SeqCst) {
            for link in &outlinks {
                if let Ok(parsed) = Url::parse(link) {
                    let _ = ctx.frontier.put(&parsed).await;
                }
            }
        }

        let parsed_page = ParsedPage {
            url: fetched.url.replace('\0', ""),
            text,
            outlinks,
        };

        ctx.db_pending.incr();
        if ctx.db_tx.send(parsed_page).await.is_err() {
            ctx.db_pending.decr();
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_visible_text_and_strips_style_script() {
        let html = r#"<html><body>
            <style>.a { color: red; }</style>
            <script>alert('x')</script>
            <p>Hello world</p>
        </body></html>"#;
        let (text, _) = extract("https://a.test/", html);
        assert!(text.contains("Hello world"));
        assert!(!text.contains("color"));
        assert!(!text.contains("alert"));
    }

    #[test]
    fn resolves_and_canonicalises_relative_links() {
        let html = r#"<html><body><a href="/page?utm_source=x&id=1">link</a></body></html>"#;
        let (_, outlinks) = extract("https://a.test/dir/", html);
        assert_eq!(outlinks, vec!["https://a.test/page?id=1".to_string()]);
    }

    #[test]
    fn drops_mailto_and_blocked_extensions() {
        let html = r#"<html><body>
            <a href="mailto:a@b.com">mail</a>
            <a href="/doc.pdf">pdf</a>
            <a href="/ok">ok</a>
        </body></html>"#;
        let (_, outlinks) = extract("https://a.test/", html);
        assert_eq!(outlinks, vec!["https://a.test/ok".to_string()]);
    }
}
