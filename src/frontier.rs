//! The fair URL frontier: a deduplicated queue with host-interleaved dequeue
//! order, so a handful of slow domains can't starve the rest of the crawl.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use url::Url;

use crate::url::extract_registrable_domain;

/// Upper bound on the number of entries held across the staging and ready
/// queues combined. `put` beyond this bound is dropped silently; the URL
/// stays in `seen` so it is never re-enqueued.
const READY_CAPACITY: usize = 25_000;

/// Maximum staging entries moved into the ready queue per [`Frontier::shuffle`] call.
const SHUFFLE_BATCH: usize = 10_000;

#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("url has no host, cannot be enqueued")]
    NoHost,
}

/// A canonical URL awaiting fetch, tagged with its registrable domain so the
/// shuffle can group it without re-parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub reg_domain: String,
}

/// Deduplicated, host-fair URL queue.
///
/// `seen` never shrinks: once a canonical URL has been accepted (or dropped
/// for being over capacity), it is never enqueued again for the lifetime of
/// the frontier.
pub struct Frontier {
    seen: Mutex<HashSet<String>>,
    staging: Mutex<VecDeque<FrontierEntry>>,
    ready: Mutex<VecDeque<FrontierEntry>>,
    outstanding: AtomicUsize,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
            staging: Mutex::new(VecDeque::new()),
            ready: Mutex::new(VecDeque::new()),
            outstanding: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Enqueues `url` if it hasn't been seen before and the frontier has
    /// room. Idempotent: a URL whose canonical form was already accepted (or
    /// already dropped for capacity) is silently ignored.
    pub async fn put(&self, url: &Url) -> Result<(), FrontierError> {
        let Some(reg_domain) = extract_registrable_domain(url) else {
            return Err(FrontierError::NoHost);
        };
        let canonical = url.as_str().to_string();

        let mut seen = self.seen.lock().await;
        if seen.contains(&canonical) {
            return Ok(());
        }
        seen.insert(canonical.clone());
        drop(seen);

        let over_capacity = {
            let staging = self.staging.lock().await;
            let ready = self.ready.lock().await;
            staging.len() + ready.len() >= READY_CAPACITY
        };
        if over_capacity {
            return Ok(());
        }

        let mut staging = self.staging.lock().await;
        staging.push_back(FrontierEntry {
            url: canonical,
            reg_domain,
        });
        drop(staging);
        self.notify.notify_waiters();

        Ok(())
    }

    /// Removes and returns a URL from the ready queue, waiting for the
    /// shuffle task to populate it if it's currently empty.
    ///
    /// Increments the outstanding-task count; callers must call
    /// [`Frontier::task_done`] exactly once for each `get()` once the item
    /// has been fully handled.
    pub async fn get(&self) -> FrontierEntry {
        loop {
            let notified = self.notify.notified();
            {
                let mut ready = self.ready.lock().await;
                if let Some(entry) = ready.pop_front() {
                    self.outstanding.fetch_add(1, Ordering::SeqCst);
                    return entry;
                }
            }
            notified.await;
        }
    }

    /// Marks one previously-`get()`'d item as fully processed.
    pub fn task_done(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    /// Re-groups up to [`SHUFFLE_BATCH`] staging entries by registrable
    /// domain and interleaves them round-robin into the ready queue.
    /// Previously-ready-but-unconsumed entries are folded back into staging
    /// ahead of newer arrivals before the regroup, so host fairness is
    /// re-evaluated on every call rather than only at first enqueue.
    pub async fn shuffle(&self) {
        let mut staging = self.staging.lock().await;
        let mut ready = self.ready.lock().await;

        while let Some(entry) = ready.pop_back() {
            staging.push_front(entry);
        }

        let batch_len = staging.len().min(SHUFFLE_BATCH);
        let batch: Vec<FrontierEntry> = staging.drain(..batch_len).collect();
        drop(staging);

        let mut domain_order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, VecDeque<FrontierEntry>> = HashMap::new();
        for entry in batch {
            groups
                .entry(entry.reg_domain.clone())
                .or_insert_with(|| {
                    domain_order.push(entry.reg_domain.clone());
                    VecDeque::new()
                })
                .push_back(entry);
        }

        loop {
            let mut progressed = false;
            for domain in &domain_order {
                if let Some(group) = groups.get_mut(domain) {
                    if let Some(entry) = group.pop_front() {
                        ready.push_back(entry);
                        progressed = true;
                    }
                }
            }
            if !progressed {
                break;
            }
        }

        if !ready.is_empty() {
            drop(ready);
            self.notify.notify_waiters();
        }
    }

    /// True iff both queues are empty and no `get()`'d item is still outstanding.
    pub async fn empty(&self) -> bool {
        let staging = self.staging.lock().await;
        let ready = self.ready.lock().await;
        staging.is_empty() && ready.is_empty() && self.outstanding.load(Ordering::SeqCst) == 0
    }

    /// Total entries across both queues (not counting outstanding `get()`s).
    pub async fn length(&self) -> usize {
        let staging = self.staging.lock().await;
        let ready = self.ready.lock().await;
        staging.len() + ready.len()
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let frontier = Frontier::new();
        frontier.put(&url("https://a.test/page")).await.unwrap();
        frontier.shuffle().await;
        let entry = frontier.get().await;
        assert_eq!(entry.url, "https://a.test/page");
        assert_eq!(entry.reg_domain, "a.test");
    }

    #[tokio::test]
    async fn duplicate_put_is_ignored() {
        let frontier = Frontier::new();
        frontier.put(&url("https://a.test/page")).await.unwrap();
        frontier.put(&url("https://a.test/page")).await.unwrap();
        assert_eq!(frontier.length().await, 1);
    }

    #[tokio::test]
    async fn task_done_clears_outstanding_and_empty_becomes_true() {
        let frontier = Frontier::new();
        frontier.put(&url("https://a.test/page")).await.unwrap();
        frontier.shuffle().await;
        assert!(!frontier.empty().await);
        let _entry = frontier.get().await;
        assert!(!frontier.empty().await, "queues drained but task not yet done");
        frontier.task_done();
        assert!(frontier.empty().await);
    }

    #[tokio::test]
    async fn empty_is_false_while_task_outstanding() {
        let frontier = Frontier::new();
        frontier.put(&url("https://a.test/page")).await.unwrap();
        frontier.shuffle().await;
        let _entry = frontier.get().await;
        assert!(!frontier.empty().await);
    }

    #[tokio::test]
    async fn shuffle_interleaves_across_domains() {
        let frontier = Frontier::new();
        for i in 0..3 {
            frontier
                .put(&url(&format!("https://a.test/{i}")))
                .await
                .unwrap();
        }
        frontier.put(&url("https://b.test/only")).await.unwrap();
        frontier.shuffle().await;

        let first = frontier.get().await;
        let second = frontier.get().await;
        assert_ne!(first.reg_domain, second.reg_domain);
    }

    #[tokio::test]
    async fn get_waits_for_shuffle_to_populate_ready_queue() {
        let frontier = std::sync::Arc::new(Frontier::new());
        frontier.put(&url("https://a.test/page")).await.unwrap();

        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move { frontier.get().await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        frontier.shuffle().await;

        let entry = waiter.await.unwrap();
        assert_eq!(entry.url, "https://a.test/page");
    }

    #[tokio::test]
    async fn rejects_url_without_host() {
        // url crate refuses to construct an http(s) URL without a host, so
        // exercise the error path through a scheme that url itself accepts
        // syntactically but that has no host component.
        let bad = Url::parse("mailto:nobody@nowhere").unwrap();
        let frontier = Frontier::new();
        assert!(frontier.put(&bad).await.is_err());
    }
}
