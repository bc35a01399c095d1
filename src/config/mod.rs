//! Loading, parsing, and validating `crawl.toml` configuration files.
//!
//! ```no_run
//! use sumi_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Will stop after {} attempts", config.crawl.max_crawl);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlConfig, UserAgentConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
