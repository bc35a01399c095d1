//! Term and term↔page edge bulk operations (`terms`, `term_page_links`),
//! used exclusively by the indexer (§4.I).

use std::collections::HashMap;

use tokio_postgres::GenericClient;

use crate::storage::StorageResult;

/// Upper bound on bound parameters per statement. Chunk sizes for both term
/// and edge inserts are derived from this so a single `INSERT` never exceeds
/// it, regardless of how large the corpus is.
pub const MAX_PARAMS: usize = 15_000;

/// Upserts a chunk of `(term, total_pages)` pairs in one multi-row
/// `INSERT ... VALUES`, returning the `term -> term_id` mapping Postgres
/// handed back via `RETURNING`. Callers are responsible for keeping
/// `rows.len() * 2 <= MAX_PARAMS` per call, the same contract
/// [`upsert_term_page_links`] follows.
///
/// `ON CONFLICT(term) DO UPDATE` makes a rebuilt index idempotent: a term
/// that survives from a previous build gets `total_pages` refreshed instead
/// of erroring, and keeps its existing `term_id` (so old edges referencing
/// it are not orphaned by the rebuild).
pub async fn upsert_terms(
    client: &impl GenericClient,
    terms: &[(String, i32)],
) -> StorageResult<HashMap<String, i64>> {
    let mut out = HashMap::with_capacity(terms.len());
    if terms.is_empty() {
        return Ok(out);
    }

    let mut sql = String::from("INSERT INTO terms (term, total_pages) VALUES ");
    let mut params: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
        Vec::with_capacity(terms.len() * 2);
    for (i, (term, total_pages)) in terms.iter().enumerate() {
        if i > 0 {
            sql.push(',');
        }
        sql.push_str(&format!("(${}, ${})", i * 2 + 1, i * 2 + 2));
        params.push(term);
        params.push(total_pages);
    }
    sql.push_str(
        " ON CONFLICT (term) DO UPDATE SET total_pages = excluded.total_pages
         RETURNING term, term_id",
    );

    let rows = client.query(sql.as_str(), &params).await?;
    for row in rows {
        let term: String = row.get(0);
        let term_id: i64 = row.get(1);
        out.insert(term, term_id);
    }
    Ok(out)
}

/// Inserts a chunk of `(term_id, page_id)` edges, ignoring rows that already
/// exist. Each pair is bound as two parameters, so callers should keep
/// `rows.len() * 2 <= MAX_PARAMS` per call — `indexer::build` is responsible
/// for chunking to that bound before calling this.
pub async fn upsert_term_page_links(
    client: &impl GenericClient,
    rows: &[(i64, i64)],
) -> StorageResult<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut sql = String::from("INSERT INTO term_page_links (term_id, page_id) VALUES ");
    let mut params: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
        Vec::with_capacity(rows.len() * 2);
    for (i, (term_id, page_id)) in rows.iter().enumerate() {
        if i > 0 {
            sql.push(',');
        }
        sql.push_str(&format!("(${}, ${})", i * 2 + 1, i * 2 + 2));
        params.push(term_id);
        params.push(page_id);
    }
    sql.push_str(" ON CONFLICT (term_id, page_id) DO NOTHING");

    client.execute(sql.as_str(), &params).await?;
    Ok(())
}

/// Returns the URLs of every page currently linked to `term`, for the
/// indexer's interactive query REPL (§4.I Phase 6).
pub async fn lookup_pages_for_term(
    client: &impl GenericClient,
    term: &str,
) -> StorageResult<Vec<String>> {
    let rows = client
        .query(
            "SELECT p.page_url FROM pages p
             JOIN term_page_links tpl ON tpl.page_id = p.page_id
             JOIN terms t ON t.term_id = tpl.term_id
             WHERE t.term = $1
             ORDER BY p.page_url",
            &[&term],
        )
        .await?;
    Ok(rows.into_iter().map(|row| row.get(0)).collect())
}
