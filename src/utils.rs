//! Small helpers shared by sources, sinks and reports.
//!
//! - String truncation for log lines, task titles and table cells
//! - Domain extraction used as the last-resort feed identity
//! - HTML-to-text for Mastodon status bodies
//! - `Link` header parsing for cursor-less pagination
//! - State file directory preparation

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

/// Matches one `<url>; rel="next"` entry of an RFC 8288 `Link` header.
static NEXT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).expect("valid regex"));

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Cut `s` to at most `max` characters, replacing the tail with `marker` when
/// anything was dropped. The result never exceeds `max` characters unless
/// `marker` itself is longer than `max`.
pub fn truncate_with_marker(s: &str, max: usize, marker: &str) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(marker.chars().count());
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(marker);
    out
}

/// Host (and explicit port) of `url`, e.g. `example.com` or `localhost:8080`.
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Visible text of an HTML fragment, with entities decoded.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

/// The `rel="next"` target of a `Link` header, if any.
pub fn next_link(header: &str) -> Option<String> {
    NEXT_LINK
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Make sure the directory holding `path` exists.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
            debug!("Directory ready");
        }
    }
    Ok(())
}
