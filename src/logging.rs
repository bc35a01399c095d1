//! Shared `tracing` subscriber setup for both binaries (`sumi-ripple` and
//! `sumi-ripple-indexer`), so verbosity flags behave identically in both.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing-subscriber` `fmt` layer filtered by `verbose`/`quiet`.
///
/// `quiet` forces error-only output and takes precedence (CLI-level
/// `conflicts_with` already keeps the two from being set together).
/// Otherwise, verbosity escalates `sumi_ripple`'s own log level from `info`
/// up through `trace`, then drops the filter entirely at `-vvv` and beyond.
pub fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_ripple=info,warn"),
            1 => EnvFilter::new("sumi_ripple=debug,info"),
            2 => EnvFilter::new("sumi_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
