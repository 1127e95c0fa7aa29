//! Command-line interface definitions for reader-sync.
//!
//! Every credential can be given as a flag or through the environment (a
//! `.env` file in the working directory is loaded first).

use crate::models::Location;
use crate::stats::SortKey;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Move items between Readwise Reader, Todoist, Pocket Casts and Mastodon.
///
/// # Examples
///
/// ```sh
/// # Tag every article in `later` that is not tagged yet
/// reader_sync tag-filter -c article -t review
///
/// # See what would be sent to Todoist without sending anything
/// reader_sync --dry-run to-todoist
///
/// # Feed statistics for the last two weeks, busiest feeds first
/// reader_sync feed-stats --weeks 2 --sort-by weekly_avg
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Do every read, perform no write
    #[arg(short, long, global = true)]
    pub dry_run: bool,

    /// Debug logging and extra report detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a settings file (default: $XDG_CONFIG_HOME/reader-sync/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Readwise access token
    #[arg(long, env = "READWISE_TOKEN", hide_env_values = true, global = true)]
    pub readwise_token: Option<String>,

    /// Todoist API token
    #[arg(long, env = "TODOIST_TOKEN", hide_env_values = true, global = true)]
    pub todoist_token: Option<String>,

    /// Mastodon instance base URL, e.g. https://mastodon.social
    #[arg(long, env = "MASTODON_INSTANCE", global = true)]
    pub mastodon_instance: Option<String>,

    /// Mastodon access token
    #[arg(long, env = "MASTODON_TOKEN", hide_env_values = true, global = true)]
    pub mastodon_token: Option<String>,

    /// Pocket Casts account email
    #[arg(long, env = "POCKETCASTS_EMAIL", global = true)]
    pub pocketcasts_email: Option<String>,

    /// Pocket Casts account password
    #[arg(long, env = "POCKETCASTS_PASSWORD", hide_env_values = true, global = true)]
    pub pocketcasts_password: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Add a tag to Reader documents matching category and tag filters
    TagFilter {
        /// Location to scan
        #[arg(short, long, value_enum, default_value_t = Location::Later)]
        location: Location,

        /// Category to include (repeatable: -c article -c rss)
        #[arg(short, long = "category")]
        categories: Vec<String>,

        /// Only documents already carrying this tag
        #[arg(long)]
        has_tag: Option<String>,

        /// Tag to add
        #[arg(short = 't', long)]
        add_tag: String,
    },

    /// Per-feed publishing statistics
    FeedStats {
        /// Days to look back
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Weeks to look back (overrides --days)
        #[arg(long)]
        weeks: Option<u32>,

        /// Only this location (default: new, later, archive and feed)
        #[arg(short, long, value_enum)]
        location: Option<Location>,

        /// Hide feeds with fewer articles
        #[arg(long, default_value_t = 1)]
        min_articles: usize,

        /// Column to sort by, descending
        #[arg(long, value_enum, default_value_t = SortKey::Total)]
        sort_by: SortKey,

        /// Category to count
        #[arg(short, long, default_value = "rss")]
        category: String,

        /// Write the report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export links of tagged `later` documents as Markdown or org-mode
    ExportLinks {
        /// Tag to export
        #[arg(short, long)]
        tag: String,

        /// org-mode instead of Markdown
        #[arg(long)]
        org: bool,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Open tagged documents in the browser
    OpenLinks {
        /// Tag to open
        #[arg(short, long)]
        tag: String,

        /// Location to scan
        #[arg(short, long, value_enum, default_value_t = Location::Later)]
        location: Location,
    },

    /// Print document titles
    List {
        /// Location to scan
        #[arg(short, long, value_enum, default_value_t = Location::Later)]
        location: Location,

        /// Only documents carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Create a Todoist task for each tagged Reader document
    ToTodoist {
        /// Reader tag marking documents to send
        #[arg(short, long, default_value = "todoist")]
        tag: String,
    },

    /// Save starred Pocket Casts episodes to Reader
    Pocketcasts,

    /// Save Mastodon bookmarks to Reader
    Mastodon,
}
