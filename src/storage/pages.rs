//! Page and link row operations (`pages`, `links`).
//!
//! Grounded in the teacher's `storage::sqlite` module's shape (one function
//! per operation, synchronous round-trips through a thin wrapper) adapted to
//! `tokio-postgres`'s async `Client` and Postgres's `RETURNING`/
//! `ON CONFLICT` upsert idioms in place of SQLite's `INSERT OR IGNORE`.

use std::collections::HashMap;

use tokio_postgres::GenericClient;

use crate::storage::{PageContent, StorageResult};

/// Upserts a page's URL and content, returning its `page_id`.
///
/// `ON CONFLICT(page_url) DO UPDATE` means a page that already exists gets
/// its content refreshed rather than rejected — this is what makes
/// re-crawling the same seeds idempotent (§8 round-trip property).
pub async fn upsert_page(
    client: &impl GenericClient,
    url: &str,
    content: &str,
) -> StorageResult<i64> {
    let row = client
        .query_one(
            "INSERT INTO pages (page_url, page_content) VALUES ($1, $2)
             ON CONFLICT (page_url) DO UPDATE SET page_content = excluded.page_content
             RETURNING page_id",
            &[&url, &content],
        )
        .await?;
    Ok(row.get(0))
}

/// Ensures every URL in `urls` exists as a page row (content left `NULL` if
/// the row is newly created — the placeholder-page invariant for outlinks
/// that haven't been crawled yet), then returns the `url -> page_id` map for
/// all of them, existing or new.
///
/// Chunked internally is unnecessary here: a page's own outlink count is
/// bounded by what one HTML document can plausibly contain, far under any
/// parameter-count limit that only matters for the indexer's bulk loads.
pub async fn ensure_pages(
    client: &impl GenericClient,
    urls: &[String],
) -> StorageResult<HashMap<String, i64>> {
    let mut ids = HashMap::with_capacity(urls.len());
    if urls.is_empty() {
        return Ok(ids);
    }

    for url in urls {
        client
            .execute(
                "INSERT INTO pages (page_url, page_content) VALUES ($1, NULL)
                 ON CONFLICT (page_url) DO NOTHING",
                &[url],
            )
            .await?;
    }

    let rows = client
        .query(
            "SELECT page_id, page_url FROM pages WHERE page_url = ANY($1)",
            &[&urls],
        )
        .await?;
    for row in rows {
        let id: i64 = row.get(0);
        let url: String = row.get(1);
        ids.insert(url, id);
    }
    Ok(ids)
}

/// Replaces `source_id`'s outlink edge set with exactly `target_ids`: removes
/// edges no longer present, inserts edges newly present, leaves unchanged
/// edges untouched. A self-edge (`source_id` present in `target_ids`) is
/// permitted (§8 boundary case).
pub async fn replace_outlinks(
    client: &impl GenericClient,
    source_id: i64,
    target_ids: &[i64],
) -> StorageResult<()> {
    client
        .execute(
            "DELETE FROM links WHERE source_page_id = $1 AND target_page_id != ALL($2)",
            &[&source_id, &target_ids],
        )
        .await?;

    for target_id in target_ids {
        client
            .execute(
                "INSERT INTO links (source_page_id, target_page_id) VALUES ($1, $2)
                 ON CONFLICT (source_page_id, target_page_id) DO NOTHING",
                &[&source_id, target_id],
            )
            .await?;
    }
    Ok(())
}

/// Streams every page with non-null content, for the indexer's scan phase.
pub async fn fetch_pages_with_content(
    client: &impl GenericClient,
) -> StorageResult<Vec<PageContent>> {
    let rows = client
        .query(
            "SELECT page_id, page_content FROM pages WHERE page_content IS NOT NULL",
            &[],
        )
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| PageContent {
            page_id: row.get(0),
            content: row.get(1),
        })
        .collect())
}
