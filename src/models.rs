//! Data models shared by every source, sink and report.
//!
//! - [`Item`]: one record pulled from a source collection, with every
//!   attribute a source may lack modelled as explicitly optional
//! - [`Location`]: the Reader triage location of a document
//!
//! Items are snapshots: the pipeline reads them and never writes them back to
//! the source.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Triage location of a Reader document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Location {
    New,
    Later,
    Shortlist,
    Archive,
    Feed,
}

impl Location {
    /// Locations scanned when no single location is requested. Fetching them one
    /// by one avoids the unfiltered listing, which is where malformed documents
    /// tend to surface.
    pub const SCAN_ALL: [Location; 4] = [
        Location::New,
        Location::Later,
        Location::Archive,
        Location::Feed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Location::New => "new",
            Location::Later => "later",
            Location::Shortlist => "shortlist",
            Location::Archive => "archive",
            Location::Feed => "feed",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Location::New),
            "later" => Ok(Location::Later),
            "shortlist" => Ok(Location::Shortlist),
            "archive" => Ok(Location::Archive),
            "feed" => Ok(Location::Feed),
            other => Err(format!("unknown location '{other}'")),
        }
    }
}

/// A record pulled from a source collection.
///
/// `id` is opaque and only unique within its source. An empty `id` means the
/// source gave us nothing stable to track the item by.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    /// Stable identifier within the source.
    pub id: String,
    /// Human title, when the source has one.
    pub title: Option<String>,
    /// Canonical URL of the underlying content.
    pub url: String,
    /// Short description or show notes.
    pub summary: Option<String>,
    /// Author or account name.
    pub author: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Tags currently attached at the source. Absent tags are an empty set.
    pub tags: BTreeSet<String>,
    /// Source category such as `article`, `rss`, `video` or `podcast`.
    pub category: Option<String>,
    pub location: Option<Location>,
    /// Publication name, e.g. the RSS feed title.
    pub site_name: Option<String>,
    /// How the item entered the source, e.g. `Reader RSS`.
    pub source: Option<String>,
}

impl Item {
    /// Title for log lines and reports: the title, else the URL, else the id.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ if !self.url.is_empty() => &self.url,
            _ if !self.id.is_empty() => &self.id,
            _ => "Untitled",
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Whether the item carries an identifier that can be persisted.
    pub fn is_identifiable(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title_prefers_title() {
        let item = Item {
            id: "1".to_string(),
            title: Some("A Title".to_string()),
            url: "https://example.com/a".to_string(),
            ..Default::default()
        };
        assert_eq!(item.display_title(), "A Title");
    }

    #[test]
    fn test_display_title_falls_back_to_url_then_id() {
        let mut item = Item {
            id: "42".to_string(),
            title: Some("   ".to_string()),
            url: "https://example.com/a".to_string(),
            ..Default::default()
        };
        assert_eq!(item.display_title(), "https://example.com/a");

        item.url.clear();
        assert_eq!(item.display_title(), "42");

        item.id.clear();
        assert_eq!(item.display_title(), "Untitled");
    }

    #[test]
    fn test_is_identifiable() {
        let mut item = Item::default();
        assert!(!item.is_identifiable());
        item.id = "  ".to_string();
        assert!(!item.is_identifiable());
        item.id = "abc".to_string();
        assert!(item.is_identifiable());
    }

    #[test]
    fn test_location_round_trips_through_str() {
        for loc in [
            Location::New,
            Location::Later,
            Location::Shortlist,
            Location::Archive,
            Location::Feed,
        ] {
            assert_eq!(loc.as_str().parse::<Location>().unwrap(), loc);
        }
        assert!("inbox".parse::<Location>().is_err());
    }
}
