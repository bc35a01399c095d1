//! Sumi-Ripple indexer entry point (§4.I).
//!
//! Scans the corpus a crawl run left in PostgreSQL, builds the term → page
//! inverted index, then drops into an interactive query REPL.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use sumi_ripple::dsn::load_dsn;
use sumi_ripple::indexer::build_index;
use sumi_ripple::logging::init_tracing;
use sumi_ripple::storage::{apply_schema, build_pool, lookup_pages_for_term};

const DEFAULT_WORKERS: usize = 30;

/// Sumi-Ripple indexer: builds and queries the term → page inverted index.
#[derive(Parser, Debug)]
#[command(name = "sumi-ripple-indexer")]
#[command(version = "1.0.0")]
#[command(about = "Builds the inverted index over a crawled corpus", long_about = None)]
struct Cli {
    /// Number of concurrent sessions distributing edge-insert chunks
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Path to a stopwords file, one word per line
    #[arg(long, value_name = "PATH", default_value = "stopwords.txt")]
    stopwords: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let dsn = load_dsn().context("loading database connection settings")?;
    let pool = build_pool(&dsn).context("building connection pool")?;
    {
        let client = pool.get().await.context("connecting to database")?;
        apply_schema(&client).await.context("applying schema")?;
    }

    let stopwords_content = std::fs::read_to_string(&cli.stopwords).with_context(|| {
        format!("reading stopwords file at {}", cli.stopwords.display())
    })?;

    tracing::info!(workers = cli.workers, "indexer: starting build");
    let report = build_index(&pool, &stopwords_content, cli.workers)
        .await
        .context("building index")?;

    println!("=== Index Build Complete ===");
    println!("Pages scanned:  {}", report.pages_scanned);
    println!("Terms kept:     {}", report.terms_kept);
    println!("Edges inserted: {}", report.edges_inserted);
    println!();

    run_query_repl(&pool).await
}

/// Phase 6: reads terms from stdin until the literal input `(quit)`,
/// printing every page URL currently linked to each term.
async fn run_query_repl(pool: &deadpool_postgres::Pool) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("Enter term: ");
        io::stdout().flush().ok();

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("reading term from stdin")?;
        let term = line.trim();

        if term == "(quit)" {
            break;
        }
        if term.is_empty() {
            continue;
        }

        let client = pool.get().await.context("connecting to database")?;
        let urls = lookup_pages_for_term(&*client, term)
            .await
            .context("looking up pages for term")?;

        if urls.is_empty() {
            println!("(no pages found)");
        } else {
            for url in &urls {
                println!("{url}");
            }
        }
    }

    Ok(())
}
