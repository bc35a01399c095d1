//! The crawl pipeline: a fair URL frontier, per-host politeness, a fetch
//! stage, a parse stage, and a persistence stage connected by bounded
//! queues, all owned and sequenced by a supervisor.

mod coordinator;
mod fetcher;
mod parser;
mod persistence;
mod scheduler;
mod types;

pub use coordinator::run_crawl;
pub use fetcher::{build_http_client, FetcherContext};
pub use parser::ParserContext;
pub use persistence::PersistenceContext;
pub use types::{FetchedPage, ParsedPage, PendingCounter};

use crate::config::Config;
use crate::SumiError;

/// Runs a complete crawl: applies the schema, seeds the frontier, starts
/// every worker pool, and carries out the staged shutdown once the crawl
/// budget is reached.
pub async fn crawl(config: Config) -> Result<(), SumiError> {
    run_crawl(config).await
}
