//! Message types passed between pipeline stages over the bounded channels.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// A fetched page handed from the fetcher to the parser.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
}

/// A parsed page handed from the parser to persistence.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub url: String,
    pub text: String,
    pub outlinks: Vec<String>,
}

/// Tracks how many items are in flight on the parse queue — queued in the
/// channel plus currently being handled by a parser worker — so the
/// supervisor can wait for `parseQueue.empty()` (§4.H step 2) the same way
/// [`crate::frontier::Frontier::empty`] accounts for outstanding `get()`s.
pub struct PendingCounter {
    count: AtomicUsize,
    notify: Notify,
}

impl PendingCounter {
    pub fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Marks one item as queued; call before handing it to the channel.
    pub fn incr(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Marks one item as fully handled; call exactly once per `incr`.
    pub fn decr(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count.load(Ordering::SeqCst) == 0
    }

    /// Waits until the counter reaches zero.
    ///
    /// The `notified()` future is created before the `is_empty()` check, not
    /// after: `Notify` only remembers a wakeup for calls to `notified()` that
    /// already exist at the time `notify_waiters()` runs, so checking first
    /// would leave a window where a `decr()` landing between the check and
    /// the subscription is silently dropped and `wait_empty` never returns.
    pub async fn wait_empty(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for PendingCounter {
    fn default() -> Self {
        Self::new()
    }
}
