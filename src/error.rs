//! Error types for each failure class the sync commands distinguish.
//!
//! Only [`CommandError`] stops a command: bad configuration, or a state file
//! that cannot be read before anything is forwarded. Everything else is
//! reported and the run continues with whatever it could still do:
//!
//! - [`FetchError`]: a page or element could not be retrieved; the items
//!   collected before it are kept.
//! - [`ForwardError`]: one item could not be delivered; its siblings are still
//!   attempted.
//! - [`StoreError`]: the processed-id file could not be read or appended to.

use std::io;
use std::path::PathBuf;

/// Problems detected before any network call is made.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required credential {0} (set it in the environment or .env)")]
    MissingCredential(&'static str),

    #[error("failed to read settings file {path}: {source}")]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    ParseSettings {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cannot locate home directory for default state files (set HOME or state_dir)")]
    NoHomeDir,
}

/// A page or element of a source collection could not be retrieved.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response page: {0}")]
    MalformedPage(#[source] serde_json::Error),

    #[error("malformed element #{index} in page: {source}")]
    MalformedElement {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("login rejected: {0}")]
    Login(String),
}

/// One item could not be delivered to its destination.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("destination rejected the item with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("item has no usable URL")]
    MissingUrl,
}

/// The processed-id file could not be read or written.
#[derive(Debug, thiserror::Error)]
#[error("state file {path}: {source}")]
pub struct StoreError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Ends a command before or after its pipeline, never in the middle of it.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to write report: {0}")]
    Report(#[from] io::Error),
}
