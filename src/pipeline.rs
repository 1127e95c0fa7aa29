//! The fetch, filter, deduplicate and forward pipeline behind every sync command.
//!
//! A run is a single sequential pass:
//!
//! 1. **Gather**: read every query's stream from the source, keeping partial
//!    results when a stream fails part way
//! 2. **Filter**: apply the command's [`FilterChain`] on the client
//! 3. **Deduplicate**: drop items whose id the [`ProcessedStore`] already holds
//! 4. **Forward**: hand each remaining item to the [`Sink`], recording its id
//!    right after the sink accepts it
//!
//! Only the caller decides what is fatal. Nothing in here aborts a run: fetch
//! errors shrink the batch, forward errors are counted, and store errors are
//! logged.

use crate::dedup::{self, Partition};
use crate::filters::{FilterChain, Predicate};
use crate::models::Item;
use crate::sinks::Sink;
use crate::sources::{Query, Source};
use crate::store::ProcessedStore;
use futures::StreamExt;
use tracing::{debug, error, info, instrument, warn};

/// Switches that change what a run is allowed to touch.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Do every read and computation, skip every write.
    pub dry_run: bool,
}

/// Items read from a source, plus how many streams ended early.
#[derive(Debug, Default)]
pub struct Gathered {
    pub items: Vec<Item>,
    pub fetch_errors: usize,
}

/// Per-item outcomes of [`forward_all`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ForwardReport {
    /// Items handed to the sink.
    pub attempted: usize,
    /// Items the sink accepted.
    pub forwarded: usize,
    /// Items the sink rejected.
    pub failed: usize,
    /// Forwarded items whose id could not be recorded.
    pub unsaved: usize,
    /// Items not handed to the sink because of a dry run.
    pub skipped: usize,
}

/// Everything a command needs to summarize a run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub fetched: usize,
    pub fetch_errors: usize,
    /// Items left after filtering.
    pub matched: usize,
    /// How many items each predicate removed, in chain order.
    pub removed: Vec<(Predicate, usize)>,
    pub already_processed: usize,
    pub forward: ForwardReport,
    /// Ids recorded in the store after the run.
    pub tracked: usize,
}

impl RunReport {
    /// Items removed by the first predicate satisfying `which`.
    pub fn removed_by(&self, which: impl Fn(&Predicate) -> bool) -> usize {
        self.removed
            .iter()
            .find(|(p, _)| which(p))
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Read every query to exhaustion, best effort.
///
/// A stream that fails keeps the items it produced before failing; the
/// failure is logged and the next query still runs.
#[instrument(level = "info", skip_all, fields(source = source.name()))]
pub async fn gather<S: Source>(source: &S, queries: &[Query]) -> Gathered {
    let mut gathered = Gathered::default();

    for query in queries {
        debug!(%query, "Fetching");
        let stream = source.fetch(query);
        let mut stream = std::pin::pin!(stream);
        let mut count = 0usize;

        while let Some(entry) = stream.next().await {
            match entry {
                Ok(item) => {
                    count += 1;
                    gathered.items.push(item);
                }
                Err(e) if count > 0 => {
                    gathered.fetch_errors += 1;
                    warn!(
                        %query,
                        retrieved = count,
                        error = %e,
                        "Fetch failed part way; continuing with the items retrieved before the error"
                    );
                }
                Err(e) => {
                    gathered.fetch_errors += 1;
                    warn!(%query, error = %e, "Fetch failed");
                }
            }
        }
        debug!(%query, count, "Fetched items");
    }

    info!(
        count = gathered.items.len(),
        errors = gathered.fetch_errors,
        "Gathered items"
    );
    gathered
}

/// Hand every item to `sink`, one at a time, in order.
///
/// A rejected item is logged with its title and id and counted; the next item
/// is attempted regardless. The id of an accepted item is recorded in `store`
/// before the next item is attempted, so a crash loses at most the record of
/// the item in flight.
pub async fn forward_all<K, P>(
    items: &[Item],
    sink: &mut K,
    store: &mut P,
    options: RunOptions,
) -> ForwardReport
where
    K: Sink,
    P: ProcessedStore,
{
    let mut report = ForwardReport::default();
    let total = items.len();

    for (index, item) in items.iter().enumerate() {
        let position = index + 1;
        let title = item.display_title();

        if options.dry_run && sink.writes() {
            report.skipped += 1;
            info!(
                position,
                total,
                id = %item.id,
                title = %title,
                action = %sink.preview(item),
                dry_run = true,
                "Would forward"
            );
            continue;
        }

        report.attempted += 1;
        debug!(position, total, id = %item.id, action = %sink.preview(item), "Forwarding");

        match sink.forward(item).await {
            Ok(()) => {
                report.forwarded += 1;
                info!(
                    position,
                    total,
                    id = %item.id,
                    title = %title,
                    sink = sink.name(),
                    dry_run = options.dry_run,
                    "Forwarded"
                );
                if options.dry_run || !store.is_tracking() || !item.is_identifiable() {
                    continue;
                }
                if let Err(e) = store.append(&item.id).await {
                    report.unsaved += 1;
                    error!(
                        id = %item.id,
                        title = %title,
                        error = %e,
                        "Forwarded but could not record id; it may be forwarded again next run"
                    );
                }
            }
            Err(e) => {
                report.failed += 1;
                error!(
                    position,
                    total,
                    id = %item.id,
                    title = %title,
                    sink = sink.name(),
                    error = %e,
                    "Failed to forward; continuing with the next item"
                );
            }
        }
    }

    report
}

/// Run the whole pipeline once.
#[instrument(level = "info", skip_all, fields(source = source.name(), sink = sink.name(), dry_run = options.dry_run))]
pub async fn run<S, K, P>(
    source: &S,
    queries: &[Query],
    filters: &FilterChain,
    sink: &mut K,
    store: &mut P,
    options: RunOptions,
) -> RunReport
where
    S: Source,
    K: Sink,
    P: ProcessedStore,
{
    let gathered = gather(source, queries).await;
    let fetched = gathered.items.len();

    let (matched, removed) = filters.apply_tallied(gathered.items);
    info!(fetched, matched = matched.len(), "Filtered items");

    let Partition { seen, fresh } = if store.is_tracking() {
        dedup::partition(matched, &*store)
    } else {
        Partition {
            seen: Vec::new(),
            fresh: matched,
        }
    };
    for item in &seen {
        info!(id = %item.id, title = %item.display_title(), "Skipping already processed item");
    }

    let matched_count = seen.len() + fresh.len();
    let forward = forward_all(&fresh, sink, store, options).await;

    RunReport {
        fetched,
        fetch_errors: gathered.fetch_errors,
        matched: matched_count,
        removed,
        already_processed: seen.len(),
        forward,
        tracked: store.len(),
    }
}
