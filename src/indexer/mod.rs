//! Indexer (§4.I): a batch job, separate from the crawl pipeline, that scans
//! the persisted corpus and builds the term → page inverted index.

pub mod build;
pub mod tokenize;

pub use build::{build_index, BuildReport};
