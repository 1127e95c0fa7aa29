//! Plain-text rendering of feed statistics.

use crate::stats::FeedStats;
use crate::utils::truncate_with_marker;
use std::fmt;

const RULE_WIDTH: usize = 80;
const MAX_FEED_NAME: usize = 40;
const BREAKDOWN_FEEDS: usize = 10;
const BREAKDOWN_WEEKS: usize = 4;
const HEADERS: [&str; 5] = ["Feed Name", "Total", "Weekly Avg", "Read Later", "Later %"];

/// What the report covers, shown in its title and summary.
#[derive(Debug, Clone)]
pub struct ReportHeader<'a> {
    /// e.g. `30 days` or `2 weeks`.
    pub window_label: &'a str,
    pub days: i64,
    /// Add the per-week breakdown section.
    pub verbose: bool,
}

/// Render `rows` in their current order.
pub fn render_stats(rows: &[FeedStats], header: &ReportHeader<'_>) -> String {
    StatsReport { rows, header }.to_string()
}

/// The full report; [`render_stats`] is the usual entry point.
struct StatsReport<'r, 'a> {
    rows: &'r [FeedStats],
    header: &'r ReportHeader<'a>,
}

impl fmt::Display for StatsReport<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);

        writeln!(f, "RSS Feed Statistics (Last {})", self.header.window_label)?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;

        if self.rows.is_empty() {
            return writeln!(f, "No feeds found matching criteria.");
        }

        let cells: Vec<[String; 5]> = self
            .rows
            .iter()
            .map(|r| {
                [
                    truncate_with_marker(&r.feed, MAX_FEED_NAME, "..."),
                    r.total.to_string(),
                    format!("{:.1}", r.weekly_avg()),
                    r.later_count.to_string(),
                    format!("{:.1}%", r.later_pct()),
                ]
            })
            .collect();
        write_table(f, &cells)?;

        let total_articles: usize = self.rows.iter().map(|r| r.total).sum();
        let total_later: usize = self.rows.iter().map(|r| r.later_count).sum();
        writeln!(f)?;
        writeln!(f, "Summary:")?;
        writeln!(f, "- Total articles: {total_articles}")?;
        writeln!(f, "- Total feeds: {}", self.rows.len())?;
        writeln!(f, "- Time range: {} days", self.header.days)?;
        if total_articles > 0 {
            let pct = total_later as f64 / total_articles as f64 * 100.0;
            writeln!(f, "- Articles with 'Read Later': {total_later} ({pct:.1}%)")?;
        }

        if self.header.verbose {
            write_breakdown(f, self.rows, &rule)?;
        }
        Ok(())
    }
}

/// Header row, dashed rule, then rows. The feed column is left aligned and
/// the numeric columns right aligned.
fn write_table(out: &mut impl fmt::Write, cells: &[[String; 5]]) -> fmt::Result {
    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cols: [&str; 5]| -> String {
        cols.iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                if i == 0 {
                    format!("{cell:<w$}")
                } else {
                    format!("{cell:>w$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    writeln!(out, "{}", line(HEADERS))?;
    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", dashes.join("  "))?;
    for row in cells {
        writeln!(out, "{}", line(row.each_ref().map(String::as_str)))?;
    }
    Ok(())
}

fn write_breakdown(out: &mut impl fmt::Write, rows: &[FeedStats], rule: &str) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "Per-Week Breakdown:")?;
    writeln!(out, "{rule}")?;

    let mut by_total: Vec<&FeedStats> = rows.iter().collect();
    by_total.sort_by(|a, b| b.total.cmp(&a.total));

    for feed in by_total.into_iter().take(BREAKDOWN_FEEDS) {
        writeln!(out)?;
        writeln!(out, "{}:", feed.feed)?;
        writeln!(out, "  Total: {} articles", feed.total)?;
        writeln!(out, "  Weekly breakdown:")?;
        for (week, count) in feed.recent_weeks().take(BREAKDOWN_WEEKS) {
            writeln!(out, "    {week}: {count} articles")?;
        }
        if feed.weeks.len() > BREAKDOWN_WEEKS {
            writeln!(out, "    ... and {} more weeks", feed.weeks.len() - BREAKDOWN_WEEKS)?;
        }
        writeln!(out, "  Read Later: {} ({:.1}%)", feed.later_count, feed.later_pct())?;
    }
    Ok(())
}
