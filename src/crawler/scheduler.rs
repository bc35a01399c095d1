//! The shuffle-task runner (§4.B): periodically re-orders the frontier for
//! host fairness so a handful of slow domains can't starve the rest of the
//! crawl.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::frontier::Frontier;

/// Shuffle interval once the crawl is past warm-up.
const STEADY_INTERVAL: Duration = Duration::from_secs(5);
/// Shuffle interval during warm-up (fewer than [`WARMUP_THRESHOLD`] pages crawled).
const WARMUP_INTERVAL: Duration = Duration::from_secs(1);
/// Below this many crawled pages the shuffle runs at [`WARMUP_INTERVAL`] instead
/// of [`STEADY_INTERVAL`], so the first few seeds spread across hosts quickly.
const WARMUP_THRESHOLD: u64 = 2;

/// Runs `frontier.shuffle()` on a timer until cancelled.
pub async fn run(frontier: Arc<Frontier>, crawled: Arc<AtomicU64>, cancel: CancellationToken) {
    loop {
        let interval = if crawled.load(Ordering::SeqCst) < WARMUP_THRESHOLD {
            WARMUP_INTERVAL
        } else {
            STEADY_INTERVAL
        };

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        frontier.shuffle().await;
    }
}
