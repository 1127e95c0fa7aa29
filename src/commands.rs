//! One function per subcommand, each wiring a source, a filter chain, a sink
//! and a store into [`pipeline::run`].

use crate::cli::{Cli, Command};
use crate::config::{require, Settings, StateKind};
use crate::error::CommandError;
use crate::filters::{FilterChain, Predicate};
use crate::models::Location;
use crate::outputs::links::LineFormat;
use crate::outputs::report::write_report;
use crate::outputs::table::{render_stats, ReportHeader};
use crate::pipeline::{self, RunOptions, RunReport};
use crate::sinks::{Browser, LineSink, ReaderSave, ReaderTagger, TodoistTasks};
use crate::sources::mastodon::MastodonClient;
use crate::sources::pocketcasts::PocketCastsClient;
use crate::sources::reader::ReaderClient;
use crate::sources::{Query, Source};
use crate::stats::{aggregate, retain_min, sort_rows, SortKey, TimeWindow};
use crate::store::{FileStore, ProcessedStore};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared by every command of one invocation.
#[derive(Debug, Clone)]
pub struct Context {
    http: Client,
    settings: Settings,
    options: RunOptions,
    verbose: bool,
}

impl Context {
    pub fn new(settings: Settings, dry_run: bool, verbose: bool) -> Result<Self, CommandError> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            settings,
            options: RunOptions { dry_run },
            verbose,
        })
    }

    fn reader(&self, cli: &Cli) -> Result<ReaderClient, CommandError> {
        let token = require(&cli.readwise_token, "READWISE_TOKEN")?;
        Ok(ReaderClient::new(self.http.clone(), token))
    }
}

/// Load settings and run the parsed command.
pub async fn execute(cli: Cli) -> Result<(), CommandError> {
    let settings = Settings::load(cli.config.as_deref())?;
    let ctx = Context::new(settings, cli.dry_run, cli.verbose)?;
    if ctx.options.dry_run {
        info!("Dry run: nothing will be written or sent");
    }

    match cli.command.clone() {
        Command::TagFilter {
            location,
            categories,
            has_tag,
            add_tag,
        } => tag_filter(&ctx, &cli, location, categories, has_tag, add_tag).await,
        Command::FeedStats {
            days,
            weeks,
            location,
            min_articles,
            sort_by,
            category,
            output,
        } => {
            let opts = FeedStatsOptions {
                window: TimeWindow::new(days, weeks),
                location,
                min_articles,
                sort_by,
                category,
                output,
            };
            feed_stats(&ctx, &cli, opts).await
        }
        Command::ExportLinks { tag, org, output } => export_links(&ctx, &cli, tag, org, output).await,
        Command::OpenLinks { tag, location } => open_links(&ctx, &cli, tag, location).await,
        Command::List { location, tag } => list(&ctx, &cli, location, tag).await,
        Command::ToTodoist { tag } => to_todoist(&ctx, &cli, tag).await,
        Command::Pocketcasts => pocketcasts(&ctx, &cli).await,
        Command::Mastodon => mastodon(&ctx, &cli).await,
    }
}

#[instrument(level = "info", skip(ctx, cli, categories, has_tag))]
async fn tag_filter(
    ctx: &Context,
    cli: &Cli,
    location: Location,
    categories: Vec<String>,
    has_tag: Option<String>,
    add_tag: String,
) -> Result<(), CommandError> {
    let client = ctx.reader(cli)?;

    let filters = tag_filter_chain(location, categories, has_tag, &add_tag);

    let mut sink = ReaderTagger::new(client.clone(), add_tag.as_str());
    let report = pipeline::run(
        &client,
        &[Query::at(location)],
        &filters,
        &mut sink,
        &mut (),
        ctx.options,
    )
    .await;

    let already_tagged = report.removed_by(|p| matches!(p, Predicate::LacksTag(_)));
    if already_tagged > 0 {
        info!(count = already_tagged, tag = %add_tag, "Skipping documents that already have the tag");
    }
    if report.matched == 0 {
        info!("No documents to tag");
    }
    log_summary("Tagged", &report, ctx.options);
    Ok(())
}

#[derive(Debug)]
struct FeedStatsOptions {
    window: TimeWindow,
    location: Option<Location>,
    min_articles: usize,
    sort_by: SortKey,
    category: String,
    output: Option<PathBuf>,
}

#[instrument(level = "info", skip(ctx, cli))]
async fn feed_stats(ctx: &Context, cli: &Cli, opts: FeedStatsOptions) -> Result<(), CommandError> {
    let client = ctx.reader(cli)?;
    let cutoff = opts.window.cutoff(Utc::now());

    // Category is never sent as a hint; the list endpoint misreports it.
    let locations = match opts.location {
        Some(l) => vec![l],
        None => Location::SCAN_ALL.to_vec(),
    };
    let queries: Vec<Query> = locations
        .iter()
        .map(|&location| Query {
            updated_after: Some(cutoff),
            ..Query::at(location)
        })
        .collect();

    let gathered = pipeline::gather(&client, &queries).await;
    let fetched = gathered.items.len();
    let items = feed_stats_chain(locations, cutoff, &opts.category).apply(gathered.items);
    info!(
        fetched,
        matched = items.len(),
        category = %opts.category,
        "Filtered to time range and category"
    );

    let mut rows = aggregate(&items);
    retain_min(&mut rows, opts.min_articles);
    sort_rows(&mut rows, opts.sort_by);

    let header = ReportHeader {
        window_label: &opts.window.label,
        days: opts.window.days,
        verbose: ctx.verbose,
    };
    let text = render_stats(&rows, &header);
    write_report(&text, opts.output.as_deref(), ctx.options.dry_run).await?;
    Ok(())
}

#[instrument(level = "info", skip(ctx, cli))]
async fn export_links(
    ctx: &Context,
    cli: &Cli,
    tag: String,
    org: bool,
    output: Option<PathBuf>,
) -> Result<(), CommandError> {
    let client = ctx.reader(cli)?;
    let format = if org { LineFormat::Org } else { LineFormat::Markdown };

    // Tag is not sent as a hint; it is unreliable on the list endpoint.
    let filters = export_links_chain(&tag);
    let mut sink = LineSink::new(format);
    let report = pipeline::run(
        &client,
        &[Query::at(Location::Later)],
        &filters,
        &mut sink,
        &mut (),
        ctx.options,
    )
    .await;

    if report.matched == 0 {
        info!(%tag, "No documents found with tag");
        return Ok(());
    }

    let mut text = sink.into_lines().join("\n");
    text.push('\n');
    write_report(&text, output.as_deref(), ctx.options.dry_run).await?;
    info!(count = report.matched, %tag, "Exported links");
    Ok(())
}

#[instrument(level = "info", skip(ctx, cli))]
async fn open_links(ctx: &Context, cli: &Cli, tag: String, location: Location) -> Result<(), CommandError> {
    let client = ctx.reader(cli)?;
    let browser = &ctx.settings.browser;

    let query = Query {
        tag: Some(tag.clone()),
        ..Query::at(location)
    };
    let filters = open_links_chain(location, tag);
    let mut sink = Browser::new(browser.command.clone(), browser.args.clone());
    let report = pipeline::run(&client, &[query], &filters, &mut sink, &mut (), ctx.options).await;

    log_summary("Opened", &report, ctx.options);
    Ok(())
}

#[instrument(level = "info", skip(ctx, cli))]
async fn list(ctx: &Context, cli: &Cli, location: Location, tag: Option<String>) -> Result<(), CommandError> {
    let client = ctx.reader(cli)?;

    let query = Query {
        tag: tag.clone(),
        ..Query::at(location)
    };
    let filters = list_chain(location, tag);
    let mut sink = LineSink::new(LineFormat::Title);
    let report = pipeline::run(&client, &[query], &filters, &mut sink, &mut (), ctx.options).await;

    for line in sink.lines() {
        println!("{line}");
    }
    info!(count = report.matched, %location, "Listed documents");
    Ok(())
}

#[instrument(level = "info", skip(ctx, cli))]
async fn to_todoist(ctx: &Context, cli: &Cli, tag: String) -> Result<(), CommandError> {
    let client = ctx.reader(cli)?;
    let todoist_token = require(&cli.todoist_token, "TODOIST_TOKEN")?;
    let settings = &ctx.settings.todoist;
    let mut store = FileStore::load(ctx.settings.state_path(StateKind::Todoist)?).await?;

    let query = Query {
        tag: Some(tag.clone()),
        ..Query::default()
    };
    let filters = to_todoist_chain(tag);
    let mut sink = TodoistTasks::new(
        ctx.http.clone(),
        todoist_token,
        settings.labels.clone(),
        settings.due_string.as_str(),
    );
    let report = pipeline::run(&client, &[query], &filters, &mut sink, &mut store, ctx.options).await;

    log_summary("Transferred", &report, ctx.options);
    Ok(())
}

#[instrument(level = "info", skip(ctx, cli))]
async fn pocketcasts(ctx: &Context, cli: &Cli) -> Result<(), CommandError> {
    let email = require(&cli.pocketcasts_email, "POCKETCASTS_EMAIL")?;
    let password = require(&cli.pocketcasts_password, "POCKETCASTS_PASSWORD")?;
    let reader = ctx.reader(cli)?;
    let mut store = FileStore::load(ctx.settings.state_path(StateKind::Pocketcasts)?).await?;

    let source = PocketCastsClient::new(ctx.http.clone(), email, password);
    let mut sink = ReaderSave::new(reader, ctx.settings.pocketcasts_tags());
    sync_into_reader(&source, &mut sink, &mut store, ctx.options).await;
    Ok(())
}

#[instrument(level = "info", skip(ctx, cli))]
async fn mastodon(ctx: &Context, cli: &Cli) -> Result<(), CommandError> {
    let instance = require(&cli.mastodon_instance, "MASTODON_INSTANCE")?;
    let token = require(&cli.mastodon_token, "MASTODON_TOKEN")?;
    let reader = ctx.reader(cli)?;
    let source = MastodonClient::new(ctx.http.clone(), instance, token)?;
    let mut store = FileStore::load(ctx.settings.state_path(StateKind::Mastodon)?).await?;

    let mut sink = ReaderSave::new(reader, ctx.settings.mastodon_tags());
    sync_into_reader(&source, &mut sink, &mut store, ctx.options).await;
    Ok(())
}

async fn sync_into_reader<S: Source>(
    source: &S,
    sink: &mut ReaderSave,
    store: &mut FileStore,
    options: RunOptions,
) {
    info!(path = %store.path().display(), tracked = store.len(), "Using state file");
    let report = pipeline::run(
        source,
        &[Query::default()],
        &FilterChain::new(),
        sink,
        store,
        options,
    )
    .await;

    if report.fetched == 0 && report.fetch_errors == 0 {
        info!(source = source.name(), "Nothing to transfer");
    }
    log_summary("Transferred", &report, options);
}

fn log_summary(verb: &str, report: &RunReport, options: RunOptions) {
    let forward = &report.forward;
    if report.already_processed > 0 {
        info!(count = report.already_processed, "Skipped items processed in earlier runs");
    }
    if forward.failed > 0 || report.fetch_errors > 0 {
        warn!(
            failed = forward.failed,
            fetch_errors = report.fetch_errors,
            "Some items could not be processed"
        );
    }
    if forward.unsaved > 0 {
        warn!(count = forward.unsaved, "Forwarded items missing from the state file");
    }
    if options.dry_run {
        info!(would_forward = forward.skipped, "Dry run complete");
        return;
    }
    info!(
        action = verb,
        forwarded = forward.forwarded,
        attempted = forward.attempted,
        tracked = report.tracked,
        "Run complete"
    );
}

// Each chain re-checks every hint its command sends in a `Query`, since the
// list endpoint may ignore any of them.

fn tag_filter_chain(
    location: Location,
    categories: Vec<String>,
    has_tag: Option<String>,
    add_tag: &str,
) -> FilterChain {
    let category_filter = (!categories.is_empty()).then(|| Predicate::CategoryIn(categories));
    FilterChain::new()
        .with(Predicate::LocationIn(vec![location]))
        .with_opt(category_filter)
        .with_opt(has_tag.map(Predicate::HasTag))
        .with(Predicate::LacksTag(add_tag.to_string()))
}

fn feed_stats_chain(
    locations: Vec<Location>,
    cutoff: DateTime<Utc>,
    category: &str,
) -> FilterChain {
    FilterChain::new()
        .with(Predicate::LocationIn(locations))
        .with(Predicate::UpdatedAfter(cutoff))
        .with(Predicate::CreatedAfter(cutoff))
        .with(Predicate::CategoryIn(vec![category.to_string()]))
}

fn export_links_chain(tag: &str) -> FilterChain {
    FilterChain::new()
        .with(Predicate::LocationIn(vec![Location::Later]))
        .with(Predicate::HasTag(tag.to_string()))
}

fn open_links_chain(location: Location, tag: String) -> FilterChain {
    FilterChain::new()
        .with(Predicate::LocationIn(vec![location]))
        .with(Predicate::HasTag(tag))
}

fn list_chain(location: Location, tag: Option<String>) -> FilterChain {
    FilterChain::new()
        .with(Predicate::LocationIn(vec![location]))
        .with_opt(tag.map(Predicate::HasTag))
}

fn to_todoist_chain(tag: String) -> FilterChain {
    FilterChain::new().with(Predicate::HasTag(tag))
}
