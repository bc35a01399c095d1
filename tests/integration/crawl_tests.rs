//! Full-pipeline integration tests.
//!
//! Scenarios exercised here need a real PostgreSQL instance, since the
//! crawl's persistence stage talks to `tokio-postgres` directly. They run
//! only when `SUMI_TEST_DATABASE_URL` names one; otherwise they're skipped,
//! per the project's test-tooling conventions.

use std::sync::atomic::{AtomicU16, Ordering};

use sumi_ripple::config::{Config, CrawlConfig, UserAgentConfig};
use sumi_ripple::crawler::crawl;
use tokio_postgres::NoTls;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static DB_SUFFIX: AtomicU16 = AtomicU16::new(0);

/// Parses `SUMI_TEST_DATABASE_URL`, if set, into the five env vars
/// `load_dsn` assembles its connection string from, and returns a direct
/// `tokio_postgres::Client` (bypassing the pool) for making assertions.
///
/// Each test gets its own database name suffix so parallel test runs don't
/// trample each other's `pages`/`links` rows.
async fn setup_test_db() -> Option<tokio_postgres::Client> {
    let raw = std::env::var("SUMI_TEST_DATABASE_URL").ok()?;
    let url = url::Url::parse(&raw).expect("SUMI_TEST_DATABASE_URL must be a valid postgres URL");

    let suffix = DB_SUFFIX.fetch_add(1, Ordering::SeqCst);
    let dbname = format!("{}_{}", url.path().trim_start_matches('/'), suffix);

    std::env::set_var("USER", url.username());
    std::env::set_var("PASSWORD", url.password().unwrap_or(""));
    std::env::set_var("HOST", url.host_str().unwrap_or("localhost"));
    std::env::set_var("PORT", url.port().unwrap_or(5432).to_string());
    std::env::set_var("DBNAME", &dbname);

    let (admin_client, admin_conn) = tokio_postgres::connect(&raw, NoTls)
        .await
        .expect("connecting to administrative database");
    tokio::spawn(async move {
        let _ = admin_conn.await;
    });
    admin_client
        .execute(&format!("CREATE DATABASE \"{dbname}\""), &[])
        .await
        .expect("creating scratch test database");

    let mut test_dsn_prefix = raw.clone();
    if let Some(idx) = test_dsn_prefix.rfind('/') {
        test_dsn_prefix.truncate(idx + 1);
    }
    let test_dsn = format!("{test_dsn_prefix}{dbname}");
    let (client, conn) = tokio_postgres::connect(&test_dsn, NoTls)
        .await
        .expect("connecting to scratch test database");
    tokio::spawn(async move {
        let _ = conn.await;
    });

    Some(client)
}

fn test_config(seeds: Vec<String>, base_url: &str) -> Config {
    Config {
        crawl: CrawlConfig {
            seeds,
            fetcher_workers: 2,
            parser_workers: 2,
            persistence_workers: 2,
            request_timeout_secs: 5,
            max_connections_per_host: 10,
            max_crawl: 10,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: base_url.to_string(),
            contact_email: "test@example.com".to_string(),
        },
    }
}

#[tokio::test]
async fn crawl_persists_page_and_outlinks() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: SUMI_TEST_DATABASE_URL not set");
        return;
    };

    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!(
                    r#"<html><body><p>hello world</p><a href="{base}/child">child</a></body></html>"#
                )),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/child"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><body><p>child page</p></body></html>"),
        )
        .mount(&mock_server)
        .await;

    let config = test_config(vec![format!("{base}/")], &base);
    crawl(config).await.expect("crawl should complete");

    let root_row = db
        .query_one(
            "SELECT page_id, page_content FROM pages WHERE page_url = $1",
            &[&format!("{base}/")],
        )
        .await
        .expect("root page row should exist");
    let root_id: i64 = root_row.get(0);
    let root_content: String = root_row.get(1);
    assert!(root_content.contains("hello world"));

    let child_row = db
        .query_one(
            "SELECT page_id FROM pages WHERE page_url = $1",
            &[&format!("{base}/child")],
        )
        .await
        .expect("child page row should exist");
    let child_id: i64 = child_row.get(0);

    let edge = db
        .query_opt(
            "SELECT 1 FROM links WHERE source_page_id = $1 AND target_page_id = $2",
            &[&root_id, &child_id],
        )
        .await
        .expect("querying links");
    assert!(edge.is_some(), "expected an edge from root to child");
}

#[tokio::test]
async fn robots_disallow_leaves_target_as_placeholder() {
    let Some(db) = setup_test_db().await else {
        eprintln!("skipping: SUMI_TEST_DATABASE_URL not set");
        return;
    };

    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/index"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!(
                    r#"<html><body><a href="{base}/private">nope</a></body></html>"#
                )),
        )
        .mount(&mock_server)
        .await;

    let config = test_config(vec![format!("{base}/index")], &base);
    crawl(config).await.expect("crawl should complete");

    let index_row = db
        .query_one(
            "SELECT page_id FROM pages WHERE page_url = $1",
            &[&format!("{base}/index")],
        )
        .await
        .expect("index page row should exist");
    assert!(index_row.get::<_, i64>(0) > 0);

    let private_row = db
        .query_one(
            "SELECT page_content FROM pages WHERE page_url = $1",
            &[&format!("{base}/private")],
        )
        .await
        .expect("disallowed page should still exist as a placeholder");
    let content: Option<String> = private_row.get(0);
    assert!(content.is_none(), "disallowed page must never be fetched");
}
