//! Storage: PostgreSQL connection pooling, schema migration, and the
//! page/link/term row operations shared by the crawler and the indexer.
//!
//! Every persistence worker (and every indexer chunk worker) pulls its own
//! connection out of a shared [`deadpool_postgres::Pool`] rather than
//! holding one dedicated `tokio_postgres::Client` for its whole lifetime —
//! the pool gives the same never-shared-mid-transaction guarantee per unit
//! of work with none of the bookkeeping of hand-rolled connection ownership.

mod pages;
mod schema;
mod stats;
mod terms;

pub use pages::{ensure_pages, fetch_pages_with_content, replace_outlinks, upsert_page};
pub use schema::apply_schema;
pub use stats::{format_markdown_summary, load_statistics, print_statistics, CrawlStatistics};
pub use terms::{lookup_pages_for_term, upsert_term_page_links, upsert_terms, MAX_PARAMS};

use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use thiserror::Error;
use tokio_postgres::NoTls;

/// Errors surfaced by any storage operation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("connection pool build error: {0}")]
    PoolBuild(#[from] deadpool_postgres::CreatePoolError),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A page row as read back for the indexer's scan phase.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub page_id: i64,
    pub content: String,
}

/// Builds a connection pool from an already-assembled PostgreSQL DSN.
pub fn build_pool(dsn: &str) -> StorageResult<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(dsn.to_string());
    let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;
    Ok(pool)
}

/// Postgres error code for a deadlock detected by the lock manager.
pub const SQLSTATE_DEADLOCK: &str = "40P01";
/// Postgres error code for a serialization failure under SSI/retryable conflict.
pub const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";

/// True iff `err` represents a transactional conflict the caller should
/// retry, per §4.G / §7 of the storage design (deadlock or serialization
/// failure, never any other constraint or connection error).
pub fn is_retryable_conflict(err: &tokio_postgres::Error) -> bool {
    err.code()
        .map(|code| {
            code.code() == SQLSTATE_DEADLOCK || code.code() == SQLSTATE_SERIALIZATION_FAILURE
        })
        .unwrap_or(false)
}
