//! Aggregate counts over the persisted corpus, backing the crawler's
//! `--stats` and `--export-summary` CLI modes.

use tokio_postgres::GenericClient;

use crate::storage::StorageResult;

/// Aggregate counts read back from `pages`, `links`, `terms`, and
/// `term_page_links`.
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub total_pages: i64,
    pub pages_with_content: i64,
    pub placeholder_pages: i64,
    pub total_links: i64,
    pub unique_domains: i64,
    pub total_terms: i64,
    pub total_term_page_links: i64,
}

/// Queries every count that makes up a [`CrawlStatistics`] snapshot.
pub async fn load_statistics(client: &impl GenericClient) -> StorageResult<CrawlStatistics> {
    let total_pages: i64 = client.query_one("SELECT COUNT(*) FROM pages", &[]).await?.get(0);
    let pages_with_content: i64 = client
        .query_one("SELECT COUNT(*) FROM pages WHERE page_content IS NOT NULL", &[])
        .await?
        .get(0);
    let total_links: i64 = client.query_one("SELECT COUNT(*) FROM links", &[]).await?.get(0);
    let unique_domains: i64 = client
        .query_one(
            "SELECT COUNT(DISTINCT split_part(regexp_replace(page_url, '^[a-zA-Z]+://', ''), '/', 1)) FROM pages",
            &[],
        )
        .await?
        .get(0);
    let total_terms: i64 = client.query_one("SELECT COUNT(*) FROM terms", &[]).await?.get(0);
    let total_term_page_links: i64 = client
        .query_one("SELECT COUNT(*) FROM term_page_links", &[])
        .await?
        .get(0);

    Ok(CrawlStatistics {
        total_pages,
        pages_with_content,
        placeholder_pages: total_pages - pages_with_content,
        total_links,
        unique_domains,
        total_terms,
        total_term_page_links,
    })
}

/// Prints a [`CrawlStatistics`] snapshot to stdout.
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");
    println!("Pages:");
    println!("  Total: {}", stats.total_pages);
    println!("  With content: {}", stats.pages_with_content);
    println!("  Placeholders (outlink only, never crawled): {}", stats.placeholder_pages);
    println!("  Unique domains: {}", stats.unique_domains);
    println!();
    println!("Links: {}", stats.total_links);
    println!();
    println!("Index:");
    println!("  Terms: {}", stats.total_terms);
    println!("  Term-page edges: {}", stats.total_term_page_links);
}

/// Formats a [`CrawlStatistics`] snapshot as a markdown document, for the
/// `--export-summary` mode.
pub fn format_markdown_summary(stats: &CrawlStatistics, config_hash: &str) -> String {
    let mut md = String::new();
    md.push_str("# Sumi-Ripple Crawl Summary\n\n");
    md.push_str(&format!("- **Config hash**: {config_hash}\n\n"));

    md.push_str("## Pages\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|---|---|\n");
    md.push_str(&format!("| Total | {} |\n", stats.total_pages));
    md.push_str(&format!("| With content | {} |\n", stats.pages_with_content));
    md.push_str(&format!("| Placeholder (never crawled) | {} |\n", stats.placeholder_pages));
    md.push_str(&format!("| Unique domains | {} |\n\n", stats.unique_domains));

    md.push_str("## Links\n\n");
    md.push_str(&format!("Total outlink edges: {}\n\n", stats.total_links));

    md.push_str("## Index\n\n");
    md.push_str(&format!("- **Terms**: {}\n", stats.total_terms));
    md.push_str(&format!("- **Term-page edges**: {}\n", stats.total_term_page_links));

    md
}
