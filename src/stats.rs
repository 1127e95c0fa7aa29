//! Per-feed publishing statistics.
//!
//! Items are grouped by [`feed_identity`], then counted in total, per week of
//! creation, and by how many sit in the `later` location. Nothing here is
//! persisted; the aggregate is rebuilt on every run.

use crate::models::{Item, Location};
use crate::utils::extract_domain;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Source names that describe the ingestion path, not the publisher.
pub const GENERIC_SOURCE_NAMES: &[&str] = &["Reader RSS"];

/// Feed an item is attributed to.
///
/// First non-empty of: site name, source name (unless generic), host of the
/// item URL, then `"unknown"`.
pub fn feed_identity(item: &Item) -> String {
    let non_empty = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(site) = non_empty(&item.site_name) {
        return site;
    }
    if let Some(source) = non_empty(&item.source).filter(|s| !GENERIC_SOURCE_NAMES.contains(&s.as_str())) {
        return source;
    }
    extract_domain(&item.url).unwrap_or_else(|| "unknown".to_string())
}

/// `YYYY-Www`, with weeks starting on Monday and days before the first Monday
/// of the year in week 00.
pub fn week_key(at: &DateTime<Utc>) -> String {
    at.format("%Y-W%W").to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedStats {
    pub feed: String,
    pub total: usize,
    /// Item count per [`week_key`].
    pub weeks: BTreeMap<String, usize>,
    pub later_count: usize,
}

impl FeedStats {
    fn new(feed: String) -> Self {
        Self {
            feed,
            total: 0,
            weeks: BTreeMap::new(),
            later_count: 0,
        }
    }

    fn add(&mut self, item: &Item) {
        self.total += 1;
        if let Some(created) = &item.created_at {
            *self.weeks.entry(week_key(created)).or_default() += 1;
        }
        if item.location == Some(Location::Later) {
            self.later_count += 1;
        }
    }

    pub fn weekly_avg(&self) -> f64 {
        self.total as f64 / self.weeks.len().max(1) as f64
    }

    pub fn later_pct(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.later_count as f64 / self.total as f64 * 100.0
    }

    /// Most recent weeks first.
    pub fn recent_weeks(&self) -> impl Iterator<Item = (&String, &usize)> {
        self.weeks.iter().rev()
    }
}

/// Group items by feed, keeping feeds in first-seen order.
pub fn aggregate<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<FeedStats> {
    let mut rows: Vec<FeedStats> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let feed = feed_identity(item);
        if feed == "unknown" {
            debug!(title = %item.display_title(), "Could not identify feed for item");
        }
        let slot = *index.entry(feed.clone()).or_insert_with(|| {
            rows.push(FeedStats::new(feed));
            rows.len() - 1
        });
        rows[slot].add(item);
    }

    rows
}

/// Column a stats table is ordered by, always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortKey {
    Feed,
    #[default]
    Total,
    #[value(name = "weekly_avg")]
    WeeklyAvg,
    #[value(name = "later_count")]
    LaterCount,
    #[value(name = "later_pct")]
    LaterPct,
}

fn compare(a: &FeedStats, b: &FeedStats, key: SortKey) -> Ordering {
    match key {
        SortKey::Feed => a.feed.cmp(&b.feed),
        SortKey::Total => a.total.cmp(&b.total),
        SortKey::WeeklyAvg => a.weekly_avg().total_cmp(&b.weekly_avg()),
        SortKey::LaterCount => a.later_count.cmp(&b.later_count),
        SortKey::LaterPct => a.later_pct().total_cmp(&b.later_pct()),
    }
}

/// Stable descending sort; ties keep their current order.
pub fn sort_rows(rows: &mut [FeedStats], key: SortKey) {
    rows.sort_by(|a, b| compare(b, a, key));
}

pub fn retain_min(rows: &mut Vec<FeedStats>, min_articles: usize) {
    rows.retain(|r| r.total >= min_articles);
}

/// Trailing time window a report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub days: i64,
    /// Human description, e.g. `2 weeks` or `30 days`.
    pub label: String,
}

impl TimeWindow {
    /// `weeks`, when given, wins over `days`.
    pub fn new(days: u32, weeks: Option<u32>) -> Self {
        let plural = |n: u32| if n == 1 { "" } else { "s" };
        match weeks {
            Some(w) => Self {
                days: i64::from(w) * 7,
                label: format!("{w} week{}", plural(w)),
            },
            None => Self {
                days: i64::from(days),
                label: format!("{days} day{}", plural(days)),
            },
        }
    }

    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(site: Option<&str>, source: Option<&str>, url: &str) -> Item {
        Item {
            id: url.to_string(),
            url: url.to_string(),
            site_name: site.map(str::to_string),
            source: source.map(str::to_string),
            ..Default::default()
        }
    }

    fn dated(site: &str, y: i32, m: u32, d: u32, location: Location) -> Item {
        Item {
            created_at: Some(Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()),
            location: Some(location),
            ..item(Some(site), None, "https://blog.example/p")
        }
    }

    #[test]
    fn test_blog_scenario() {
        let items = vec![
            dated("Blog X", 2025, 1, 7, Location::Archive),
            dated("Blog X", 2025, 1, 8, Location::Feed),
            dated("Blog X", 2025, 1, 14, Location::Later),
        ];

        let rows = aggregate(&items);

        assert_eq!(rows.len(), 1);
        let blog = &rows[0];
        assert_eq!(blog.feed, "Blog X");
        assert_eq!(blog.total, 3);
        assert_eq!(blog.weeks.len(), 2);
        assert!((blog.weekly_avg() - 1.5).abs() < 1e-9);
        assert_eq!(blog.later_count, 1);
        assert_eq!(format!("{:.1}", blog.later_pct()), "33.3");
    }

    #[test]
    fn test_generic_source_falls_back_to_domain() {
        let it = item(None, Some("Reader RSS"), "https://example.com/a");
        assert_eq!(feed_identity(&it), "example.com");
    }

    #[test]
    fn test_identity_order() {
        assert_eq!(feed_identity(&item(Some("Site"), Some("Src"), "https://a.com")), "Site");
        assert_eq!(feed_identity(&item(Some("  "), Some("Src"), "https://a.com")), "Src");
        assert_eq!(feed_identity(&item(None, None, "https://a.com:8080/x")), "a.com:8080");
        assert_eq!(feed_identity(&item(None, None, "not a url")), "unknown");
    }

    #[test]
    fn test_week_key_is_monday_based() {
        let sunday = Utc.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
        let monday = Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap();
        assert_eq!(week_key(&sunday), "2025-W00");
        assert_eq!(week_key(&monday), "2025-W01");
    }

    #[test]
    fn test_items_without_timestamp_count_in_total_only() {
        let rows = aggregate(&[item(Some("S"), None, "https://s.com")]);
        assert_eq!(rows[0].total, 1);
        assert!(rows[0].weeks.is_empty());
        assert!((rows[0].weekly_avg() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let items = vec![
            item(Some("A"), None, "https://a"),
            item(Some("B"), None, "https://b"),
            item(Some("B"), None, "https://b"),
            item(Some("C"), None, "https://c"),
        ];
        let mut rows = aggregate(&items);
        sort_rows(&mut rows, SortKey::Total);
        let feeds: Vec<&str> = rows.iter().map(|r| r.feed.as_str()).collect();
        assert_eq!(feeds, vec!["B", "A", "C"]);

        retain_min(&mut rows, 2);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_time_window_weeks_win() {
        let w = TimeWindow::new(30, Some(2));
        assert_eq!(w.days, 14);
        assert_eq!(w.label, "2 weeks");
        assert_eq!(TimeWindow::new(1, None).label, "1 day");

        let now = Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(w.cutoff(now), Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }
}
