//! Phases 1, 3, 4, 5 (§4.I): scan pages, aggregate the term dictionary,
//! bulk-upsert terms, then bulk-insert term↔page edges across a worker pool.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use deadpool_postgres::Pool;

use crate::indexer::tokenize::{load_stopwords, tokenize};
use crate::storage::{fetch_pages_with_content, upsert_term_page_links, upsert_terms, StorageResult, MAX_PARAMS};

/// Terms appearing on this many pages or fewer are pruned entirely.
const MIN_PAGE_COUNT: usize = 10;
/// Terms outside this length range need at least [`RARE_LENGTH_MIN_PAGES`]
/// pages to survive pruning.
const COMMON_LENGTH_MIN: usize = 4;
const COMMON_LENGTH_MAX: usize = 15;
const RARE_LENGTH_MIN_PAGES: usize = 20;

/// Each `(term_id, page_id)` row binds two parameters; this is the maximum
/// number of rows one `upsert_term_page_links` call can carry.
const EDGE_ROWS_PER_CHUNK: usize = MAX_PARAMS / 2;

/// How many edge chunks one worker commits before starting a fresh session
/// — the indexer has no open transaction to commit, so this is simply a
/// progress-logging cadence, kept for parity with the worker pool design.
const CHUNKS_PER_PROGRESS_LOG: usize = 30;

/// Number of workers distributing edge-insert chunks, if the caller passes
/// more than one.
pub struct BuildReport {
    pub pages_scanned: usize,
    pub terms_kept: usize,
    pub edges_inserted: usize,
}

/// Runs phases 1, 3, 4, and 5 of the index build against `pool`, using
/// `stopwords_content` (the raw contents of a stopwords file) for phase 2's
/// tokeniser, and `workers` concurrent sessions for phase 5's edge inserts.
pub async fn build_index(pool: &Pool, stopwords_content: &str, workers: usize) -> StorageResult<BuildReport> {
    let stopwords = load_stopwords(stopwords_content);

    // Phase 1: scan.
    let pages = {
        let client = pool.get().await?;
        fetch_pages_with_content(&*client).await?
    };
    let pages_scanned = pages.len();
    tracing::info!(pages_scanned, "indexer: scan complete");

    // Phase 2 + 3: tokenise each page, then aggregate into term -> pages.
    let mut term_dict: HashMap<String, HashSet<i64>> = HashMap::new();
    for page in &pages {
        let counts = tokenize(&page.content, &stopwords);
        for term in counts.keys() {
            term_dict.entry(term.clone()).or_default().insert(page.page_id);
        }
    }

    term_dict.retain(|term, page_ids| {
        let count = page_ids.len();
        if count <= MIN_PAGE_COUNT {
            return false;
        }
        let len = term.chars().count();
        if !(COMMON_LENGTH_MIN..=COMMON_LENGTH_MAX).contains(&len) && count < RARE_LENGTH_MIN_PAGES {
            return false;
        }
        true
    });
    tracing::info!(terms_kept = term_dict.len(), "indexer: aggregation complete");

    // Phase 4: insert terms, chunked under MAX_PARAMS (2 params/row).
    let term_rows: Vec<(String, i32)> = term_dict
        .iter()
        .map(|(term, pages)| (term.clone(), pages.len() as i32))
        .collect();
    let term_ids = upsert_terms_chunked(pool, &term_rows).await?;

    // Phase 5: expand (term_id, page_id) edges and insert across a worker pool.
    let mut edges = Vec::new();
    for (term, page_ids) in &term_dict {
        let Some(term_id) = term_ids.get(term) else {
            continue;
        };
        for page_id in page_ids {
            edges.push((*term_id, *page_id));
        }
    }
    let edges_inserted = edges.len();
    insert_edges_pooled(pool, edges, workers.max(1)).await?;
    tracing::info!(edges_inserted, "indexer: edge insert complete");

    Ok(BuildReport {
        pages_scanned,
        terms_kept: term_ids.len(),
        edges_inserted,
    })
}

async fn upsert_terms_chunked(pool: &Pool, rows: &[(String, i32)]) -> StorageResult<HashMap<String, i64>> {
    const ROWS_PER_CHUNK: usize = MAX_PARAMS / 2;
    let client = pool.get().await?;
    let mut ids = HashMap::with_capacity(rows.len());
    for chunk in rows.chunks(ROWS_PER_CHUNK.max(1)) {
        let chunk_ids = upsert_terms(&*client, chunk).await?;
        ids.extend(chunk_ids);
    }
    Ok(ids)
}

async fn insert_edges_pooled(pool: &Pool, edges: Vec<(i64, i64)>, workers: usize) -> StorageResult<()> {
    let chunks: Vec<Vec<(i64, i64)>> = edges
        .chunks(EDGE_ROWS_PER_CHUNK.max(1))
        .map(|c| c.to_vec())
        .collect();

    let pool = pool.clone();
    let mut handles = Vec::new();
    for worker_chunks in distribute(chunks, workers) {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let client = pool.get().await?;
            for (i, chunk) in worker_chunks.iter().enumerate() {
                upsert_term_page_links(&*client, chunk).await?;
                if (i + 1) % CHUNKS_PER_PROGRESS_LOG == 0 {
                    tracing::debug!(chunks_committed = i + 1, "indexer: edge chunk progress");
                }
            }
            Ok::<(), crate::storage::StorageError>(())
        }));
    }

    for handle in handles {
        handle
            .await
            .map_err(|e| crate::storage::StorageError::Database(panic_to_pg_error(e)))??;
    }
    Ok(())
}

/// Splits `chunks` round-robin across `workers` buckets.
fn distribute<T>(chunks: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    let mut buckets: Vec<Vec<T>> = (0..workers).map(|_| Vec::new()).collect();
    for (i, chunk) in chunks.into_iter().enumerate() {
        buckets[i % workers].push(chunk);
    }
    buckets
}

/// A worker task only panics on a bug, never on a handled error; this
/// exists solely so `JoinError` has somewhere to go without inventing a
/// fake `tokio_postgres::Error` variant.
fn panic_to_pg_error(_: tokio::task::JoinError) -> tokio_postgres::Error {
    // tokio_postgres::Error has no public constructor for synthetic errors;
    // a join failure here means a worker task panicked, which is itself a
    // programming error this indexer has no recovery path for.
    unreachable!("indexer edge-insert worker panicked")
}
