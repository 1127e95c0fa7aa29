//! Sources of items: the services a command reads from.
//!
//! Every source exposes its collection as a lazy [`Stream`] of
//! `Result<Item, FetchError>`. Pages are only requested as the stream is
//! polled, and pagination stays hidden inside the adapter.
//!
//! # Supported Sources
//!
//! | Source | Module | Pagination |
//! |--------|--------|------------|
//! | Readwise Reader | [`reader`] | `nextPageCursor` continuation |
//! | Mastodon bookmarks | [`mastodon`] | `Link: <...>; rel="next"` header |
//! | Pocket Casts starred episodes | [`pocketcasts`] | single page |
//!
//! # Failure Contract
//!
//! A malformed element or a failed page request ends the stream with a single
//! `Err` after every element decoded before it. Callers keep what they got
//! and report the error (see [`crate::pipeline::gather`]).

pub mod mastodon;
pub mod pocketcasts;
pub mod reader;

use crate::error::FetchError;
use crate::models::{Item, Location};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

/// Server-side filter hints for one fetch.
///
/// Sources may ignore any of them; results are always filtered again on the
/// client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub location: Option<Location>,
    pub tag: Option<String>,
    pub updated_after: Option<DateTime<Utc>>,
}

impl Query {
    pub fn at(location: Location) -> Self {
        Self {
            location: Some(location),
            ..Default::default()
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(l) = self.location {
            parts.push(format!("location={l}"));
        }
        if let Some(t) = &self.tag {
            parts.push(format!("tag={t}"));
        }
        if let Some(u) = &self.updated_after {
            parts.push(format!("updated_after={}", u.to_rfc3339()));
        }
        if parts.is_empty() {
            f.write_str("all")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

/// A collection that can be read as a stream of items.
pub trait Source {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Start reading the collection from the beginning.
    fn fetch(&self, query: &Query) -> impl Stream<Item = Result<Item, FetchError>> + 'static;
}

/// One decoded response page.
#[derive(Debug, Default)]
pub struct Page {
    /// Elements in order. Decoding stops at the first malformed element, which
    /// is kept as the last entry.
    pub entries: Vec<Result<Item, FetchError>>,
    /// Continuation for the next request, `None` on the last page.
    pub next: Option<String>,
}

/// Decode raw JSON elements one by one, stopping after the first failure.
pub fn decode_elements<T, F>(values: Vec<serde_json::Value>, convert: F) -> Vec<Result<Item, FetchError>>
where
    T: DeserializeOwned,
    F: Fn(T) -> Item,
{
    let mut entries = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(raw) => entries.push(Ok(convert(raw))),
            Err(source) => {
                entries.push(Err(FetchError::MalformedElement { index, source }));
                break;
            }
        }
    }
    entries
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

struct PageState<F> {
    fetch_page: F,
    cursor: Cursor,
    /// Every continuation already requested.
    requested: HashSet<String>,
    buffered: VecDeque<Result<Item, FetchError>>,
}

/// Turn a page-at-a-time fetch function into a lazy item stream.
///
/// `fetch_page` receives `None` for the first page and the previous page's
/// continuation afterwards. The stream ends when a page has no continuation,
/// when it hands back a continuation already requested (so cycles end too),
/// or right after the first error.
pub fn paginate<F, Fut>(fetch_page: F) -> impl Stream<Item = Result<Item, FetchError>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page, FetchError>>,
{
    let state = PageState {
        fetch_page,
        cursor: Cursor::Start,
        requested: HashSet::new(),
        buffered: VecDeque::new(),
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(entry) = st.buffered.pop_front() {
                if entry.is_err() {
                    st.buffered.clear();
                    st.cursor = Cursor::Done;
                }
                return Some((entry, st));
            }

            let cursor = match std::mem::replace(&mut st.cursor, Cursor::Done) {
                Cursor::Done => return None,
                Cursor::Start => None,
                Cursor::Next(c) => Some(c),
            };
            if let Some(c) = &cursor {
                st.requested.insert(c.clone());
            }

            match (st.fetch_page)(cursor).await {
                Ok(page) => {
                    debug!(
                        entries = page.entries.len(),
                        has_next = page.next.is_some(),
                        "Fetched page"
                    );
                    st.buffered = page.entries.into();
                    match page.next {
                        Some(next) if st.requested.contains(&next) => {
                            warn!(cursor = %next, "Source repeated its continuation; stopping");
                        }
                        Some(next) => st.cursor = Cursor::Next(next),
                        None => {}
                    }
                }
                Err(e) => return Some((Err(e), st)),
            }
        }
    })
}
