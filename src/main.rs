//! # reader-sync
//!
//! Keeps a Readwise Reader library in step with the services around it:
//! bulk-tags documents, reports per-feed statistics, exports or opens tagged
//! links, sends tagged documents to Todoist, and saves Pocket Casts stars and
//! Mastodon bookmarks into Reader.
//!
//! ## Usage
//!
//! ```sh
//! reader_sync tag-filter -c article -t review
//! reader_sync --dry-run mastodon
//! ```
//!
//! ## Architecture
//!
//! Every subcommand is the same pipeline with different parts:
//! 1. **Source**: lazily paginated items from Reader, Mastodon or Pocket Casts
//! 2. **Filters**: tag, category, location and time predicates, applied locally
//! 3. **Deduplication**: ids already forwarded in earlier runs are dropped
//! 4. **Sink**: Reader, Todoist, the browser, or a text report
//!
//! Forwarded ids are appended to a per-command state file one at a time, so an
//! interrupted run resumes where it stopped.

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod commands;
mod config;
mod dedup;
mod error;
mod filters;
mod models;
mod outputs;
mod pipeline;
mod sinks;
mod sources;
mod stats;
mod store;
mod utils;

use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let env_file = dotenvy::dotenv();
    let args = Cli::parse();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(args.verbose)));
    tfmt()
        .with_env_filter(filter)
        .with_target(args.verbose)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    match env_file {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) => debug!(error = %e, "No .env loaded"),
    }
    debug!(command = ?args.command, dry_run = args.dry_run, "Parsed CLI arguments");

    if let Err(e) = commands::execute(args).await {
        error!(error = %e, "Command failed");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
}

/// Used when `RUST_LOG` is unset. `--verbose` raises only this crate to debug,
/// so reqwest and hyper stay at info.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,reader_sync=debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_filter_is_scoped_to_this_crate() {
        assert_eq!(default_filter(false), "info");
        assert_eq!(default_filter(true), "info,reader_sync=debug");
        assert!(EnvFilter::try_new(default_filter(true)).is_ok());
    }
}
