//! PostgreSQL schema definitions.
//!
//! Applied idempotently at startup of both binaries, the same way the
//! teacher's schema module ran its `CREATE TABLE IF NOT EXISTS` batch on
//! every connection open.

use tokio_postgres::Client;

use crate::storage::StorageError;

/// DDL applied, in order, at startup.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pages (
    page_id BIGSERIAL PRIMARY KEY,
    page_url TEXT NOT NULL UNIQUE,
    page_content TEXT
);

CREATE TABLE IF NOT EXISTS links (
    source_page_id BIGINT NOT NULL REFERENCES pages(page_id),
    target_page_id BIGINT NOT NULL REFERENCES pages(page_id),
    PRIMARY KEY (source_page_id, target_page_id)
);

CREATE TABLE IF NOT EXISTS terms (
    term_id BIGSERIAL PRIMARY KEY,
    term TEXT NOT NULL UNIQUE,
    total_pages INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS term_page_links (
    term_id BIGINT NOT NULL REFERENCES terms(term_id),
    page_id BIGINT NOT NULL REFERENCES pages(page_id),
    PRIMARY KEY (term_id, page_id)
);
"#;

/// Applies [`SCHEMA_SQL`] against `client`. Safe to call on every startup.
pub async fn apply_schema(client: &Client) -> Result<(), StorageError> {
    client.batch_execute(SCHEMA_SQL).await?;
    Ok(())
}
