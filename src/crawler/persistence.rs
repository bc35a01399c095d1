//! Persistence workers (§4.G): upsert pages and replace their outlink edge
//! sets inside one transaction per page, retrying on transactional conflict.

use std::time::Duration;

use deadpool_postgres::Pool;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::crawler::types::{ParsedPage, PendingCounter};
use crate::errorlog::ErrorLog;
use crate::storage::{ensure_pages, is_retryable_conflict, replace_outlinks, upsert_page, StorageError};

const DEADLOCK_BACKOFF: Duration = Duration::from_millis(100);

/// Errors a single persist attempt can raise. Only a [`StorageError::Database`]
/// carrying a retryable SQLSTATE is ever retried; pool exhaustion and any
/// other storage error is logged and dropped, per the "store other" policy.
#[derive(Debug, Error)]
enum PersistError {
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PersistError {
    fn is_retryable(&self) -> bool {
        matches!(self, PersistError::Storage(StorageError::Database(e)) if is_retryable_conflict(e))
    }
}

/// Multiple persistence workers share one receiver; `mpsc::Receiver` has a
/// single consumer, so the receiver itself is shared behind a lock instead.
pub type SharedDbRx = Arc<Mutex<mpsc::Receiver<ParsedPage>>>;

pub struct PersistenceContext {
    pub pool: Pool,
    pub db_rx: SharedDbRx,
    pub db_pending: Arc<PendingCounter>,
    pub error_log: Arc<ErrorLog>,
    pub cancel: CancellationToken,
}

/// Runs one persistence worker until its DB-queue channel closes or it's
/// cancelled. Cancellation only breaks the loop between items — a page
/// already pulled off the channel is always committed (or its failure
/// logged) before the worker checks for cancellation again.
pub async fn run(ctx: PersistenceContext) {
    loop {
        let page = {
            let mut rx = ctx.db_rx.lock().await;
            tokio::select! {
                _ = ctx.cancel.cancelled() => return,
                item = rx.recv() => item,
            }
        };
        let Some(page) = page else { return };

        if let Err(err) = persist_with_retry(&ctx.pool, &page).await {
            ctx.error_log
                .record(
                    "persistence::run",
                    "store error",
                    &format!("url={} err={err}", page.url),
                )
                .await;
        }
        ctx.db_pending.decr();
    }
}

async fn persist_with_retry(pool: &Pool, page: &ParsedPage) -> Result<(), PersistError> {
    loop {
        match persist_once(pool, page).await {
            Ok(()) => return Ok(()),
            Err(err) if err.is_retryable() => {
                tokio::time::sleep(DEADLOCK_BACKOFF).await;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn persist_once(pool: &Pool, page: &ParsedPage) -> Result<(), PersistError> {
    let mut client = pool.get().await?;
    let txn = client.transaction().await?;

    let page_id = upsert_page(&txn, &page.url, &page.text).await?;

    let target_ids = if page.outlinks.is_empty() {
        Vec::new()
    } else {
        let ids = ensure_pages(&txn, &page.outlinks).await?;
        page.outlinks
            .iter()
            .filter_map(|url| ids.get(url).copied())
            .collect()
    };

    replace_outlinks(&txn, page_id, &target_ids).await?;

    txn.commit().await.map_err(StorageError::from)?;
    Ok(())
}
