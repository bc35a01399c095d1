//! Sumi-Ripple main entry point.
//!
//! This is the command-line interface for the Sumi-Ripple web crawler.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use url::Url;

use sumi_ripple::config::{load_config_with_hash, Config};
use sumi_ripple::crawler::crawl;
use sumi_ripple::dsn::load_dsn;
use sumi_ripple::logging::init_tracing;
use sumi_ripple::storage::{build_pool, format_markdown_summary, load_statistics, print_statistics};

/// Sumi-Ripple: a polite, concurrent web crawler.
///
/// Sumi-Ripple crawls websites while respecting robots.txt, crawl-delay, and
/// per-domain rate limits, persisting every page and its outgoing link graph.
#[derive(Parser, Debug)]
#[command(name = "sumi-ripple")]
#[command(version = "1.0.0")]
#[command(about = "A polite, concurrent web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Additional seed URL, layered over the config file's seed list (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted crawl (default behavior; re-crawling already-stored
    /// pages refreshes their content idempotently)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl; informational only, since page upserts are
    /// idempotent regardless
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show corpus statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate a markdown summary from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,

    /// Output path for `--export-summary`
    #[arg(long, value_name = "PATH", default_value = "summary.md")]
    summary_path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    tracing::info!("loading configuration from {}", cli.config.display());
    let (mut config, config_hash) =
        load_config_with_hash(&cli.config).context("loading configuration")?;
    tracing::info!(config_hash = %config_hash, "configuration loaded");

    layer_extra_seeds(&mut config, &cli.seeds)?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats().await?;
    } else if cli.export_summary {
        handle_export_summary(&config_hash, &cli.summary_path).await?;
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Appends `--seed` CLI arguments, then any URLs piped on stdin (one per
/// line, ignored when stdin is an interactive terminal), to the config's
/// seed list.
fn layer_extra_seeds(config: &mut Config, cli_seeds: &[String]) -> anyhow::Result<()> {
    for seed in cli_seeds {
        validate_seed(seed)?;
        config.crawl.seeds.push(seed.clone());
    }

    if !std::io::stdin().is_terminal() {
        for line in std::io::stdin().lines() {
            let line = line.context("reading seed URL from stdin")?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            validate_seed(line)?;
            config.crawl.seeds.push(line.to_string());
        }
    }

    Ok(())
}

fn validate_seed(seed: &str) -> anyhow::Result<()> {
    Url::parse(seed).with_context(|| format!("seed '{seed}' is not a valid URL"))?;
    Ok(())
}

/// Handles `--dry-run`: validates config and shows what would be crawled,
/// without touching the database or the network.
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Ripple Dry Run ===\n");

    println!("Crawl:");
    println!("  Fetcher workers: {}", config.crawl.fetcher_workers);
    println!("  Parser workers: {}", config.crawl.parser_workers);
    println!("  Persistence workers: {}", config.crawl.persistence_workers);
    println!("  Request timeout: {}s", config.crawl.request_timeout_secs);
    println!(
        "  Max connections per host: {}",
        config.crawl.max_connections_per_host
    );
    println!("  Max crawl attempts: {}", config.crawl.max_crawl);

    println!("\nUser agent:");
    println!("  Identity: {}", config.user_agent.identity());

    println!("\nSeeds ({}):", config.crawl.seeds.len());
    for seed in &config.crawl.seeds {
        println!("  - {seed}");
    }

    println!("\n\u{2713} Configuration is valid");
}

/// Handles `--stats`: connects to the database and prints aggregate counts.
async fn handle_stats() -> anyhow::Result<()> {
    let dsn = load_dsn().context("loading database connection settings")?;
    let pool = build_pool(&dsn).context("building connection pool")?;
    let client = pool.get().await.context("connecting to database")?;

    let stats = load_statistics(&*client).await.context("loading statistics")?;
    print_statistics(&stats);
    Ok(())
}

/// Handles `--export-summary`: connects to the database and writes a
/// markdown summary to `summary_path`.
async fn handle_export_summary(config_hash: &str, summary_path: &PathBuf) -> anyhow::Result<()> {
    let dsn = load_dsn().context("loading database connection settings")?;
    let pool = build_pool(&dsn).context("building connection pool")?;
    let client = pool.get().await.context("connecting to database")?;

    let stats = load_statistics(&*client).await.context("loading statistics")?;
    let markdown = format_markdown_summary(&stats, config_hash);

    std::fs::write(summary_path, markdown)
        .with_context(|| format!("writing summary to {}", summary_path.display()))?;

    println!("\u{2713} Summary exported to: {}", summary_path.display());
    Ok(())
}

/// Handles the main crawl operation.
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("starting fresh crawl");
    } else {
        tracing::info!("starting crawl (re-crawling existing pages refreshes their content)");
    }
    tracing::info!(seed_count = config.crawl.seeds.len(), "seeds loaded");

    crawl(config).await.context("crawl failed")?;
    tracing::info!("crawl completed successfully");
    Ok(())
}
