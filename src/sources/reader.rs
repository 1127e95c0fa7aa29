//! Readwise Reader v3 API client.
//!
//! The same client backs the document listing source and the save and
//! tag-update sinks (see [`crate::sinks::reader`]).
//!
//! # Endpoints
//!
//! - `GET  /api/v3/list/` with `location`, `tag`, `updatedAfter` and
//!   `pageCursor` query parameters
//! - `POST /api/v3/save/` to create a document
//! - `PATCH /api/v3/update/{id}/` to replace a document's tags
//!
//! Tag and category filtering on the list endpoint are unreliable; the
//! category parameter in particular has been seen to produce malformed
//! responses. Commands therefore send few hints and filter locally.

use super::{decode_elements, paginate, Page, Query, Source};
use crate::error::{FetchError, ForwardError};
use crate::models::Item;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::Stream;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

pub const READER_API_BASE: &str = "https://readwise.io/api/v3";

/// Authenticated handle to the Reader API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReaderClient {
    http: Client,
    token: String,
    base: String,
}

/// A document as returned by the list endpoint.
#[derive(Debug, Deserialize)]
struct ReaderDocument {
    #[serde(default)]
    id: String,
    /// Reader's own URL for the document.
    #[serde(default)]
    url: Option<String>,
    /// URL of the original content.
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default, deserialize_with = "tag_names")]
    tags: BTreeSet<String>,
    #[serde(default)]
    site_name: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(rename = "nextPageCursor", default)]
    next_page_cursor: Option<String>,
}

/// Body of `POST /save/`.
#[derive(Debug, Serialize)]
struct SaveRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a str>,
    tags: &'a [String],
}

/// Body of `PATCH /update/{id}/`.
#[derive(Debug, Serialize)]
struct UpdateTagsRequest<'a> {
    tags: &'a [String],
}

/// Reader returns tags as an object keyed by tag name, sometimes as `null`.
/// Lists of names or of `{ "name": .. }` objects are accepted as well.
fn tag_names<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Object(map)) => map.into_iter().map(|(name, _)| name).collect(),
        Some(Value::Array(list)) => list
            .into_iter()
            .filter_map(|v| match v {
                Value::String(name) => Some(name),
                Value::Object(o) => o.get("name").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        _ => BTreeSet::new(),
    })
}

impl From<ReaderDocument> for Item {
    fn from(doc: ReaderDocument) -> Self {
        let url = doc
            .source_url
            .filter(|u| !u.is_empty())
            .or(doc.url)
            .unwrap_or_default();
        Item {
            id: doc.id,
            title: doc.title,
            url,
            summary: doc.summary,
            author: doc.author,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            tags: doc.tags,
            category: doc.category,
            location: doc.location.and_then(|l| l.parse().ok()),
            site_name: doc.site_name,
            source: doc.source,
        }
    }
}

/// Decode one list response body.
fn parse_list_page(body: &str) -> Result<Page, FetchError> {
    let list: ListResponse = serde_json::from_str(body).map_err(FetchError::MalformedPage)?;
    Ok(Page {
        entries: decode_elements::<ReaderDocument, _>(list.results, Item::from),
        next: list.next_page_cursor.filter(|c| !c.is_empty()),
    })
}

impl ReaderClient {
    pub fn new(http: Client, token: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
            base: READER_API_BASE.to_string(),
        }
    }

    fn auth(&self) -> String {
        format!("Token {}", self.token)
    }

    /// Fetch one page of the document list.
    #[instrument(level = "debug", skip(self, query), fields(%query))]
    async fn list_page(&self, query: &Query, cursor: Option<String>) -> Result<Page, FetchError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(location) = query.location {
            params.push(("location", location.to_string()));
        }
        if let Some(tag) = &query.tag {
            params.push(("tag", tag.clone()));
        }
        if let Some(after) = query.updated_after {
            params.push((
                "updatedAfter",
                after.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        if let Some(cursor) = cursor {
            params.push(("pageCursor", cursor));
        }

        let body = self
            .http
            .get(format!("{}/list/", self.base))
            .header(AUTHORIZATION, self.auth())
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(bytes = body.len(), "Received list page");
        parse_list_page(&body)
    }

    /// Create a document.
    #[instrument(level = "debug", skip_all, fields(url = %url))]
    pub async fn save(
        &self,
        url: &str,
        title: Option<&str>,
        summary: Option<&str>,
        author: Option<&str>,
        tags: &[String],
    ) -> Result<(), ForwardError> {
        let body = SaveRequest {
            url,
            title,
            summary,
            author,
            tags,
        };
        let resp = self
            .http
            .post(format!("{}/save/", self.base))
            .header(AUTHORIZATION, self.auth())
            .json(&body)
            .send()
            .await?;
        check_status(resp).await
    }

    /// Replace the full tag list of document `id`.
    #[instrument(level = "debug", skip(self, tags))]
    pub async fn update_tags(&self, id: &str, tags: &[String]) -> Result<(), ForwardError> {
        let resp = self
            .http
            .patch(format!("{}/update/{}/", self.base, id))
            .header(AUTHORIZATION, self.auth())
            .json(&UpdateTagsRequest { tags })
            .send()
            .await?;
        check_status(resp).await
    }
}

/// Map a non-success response to [`ForwardError::Rejected`].
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<(), ForwardError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ForwardError::Rejected {
        status,
        body: crate::utils::truncate_for_log(&body, 200),
    })
}

impl Source for ReaderClient {
    fn name(&self) -> &'static str {
        "reader"
    }

    fn fetch(&self, query: &Query) -> impl Stream<Item = Result<Item, FetchError>> + 'static {
        let client = self.clone();
        let query = query.clone();
        paginate(move |cursor| {
            let client = client.clone();
            let query = query.clone();
            async move { client.list_page(&query, cursor).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;

    const PAGE: &str = r#"{
        "count": 3,
        "nextPageCursor": "01h6",
        "results": [
            {
                "id": "01gwfvp9pyaabcdgmx14f6ha0",
                "url": "https://read.readwise.io/new/read/01gwfvp9pyaabcdgmx14f6ha0",
                "source_url": "https://example.com/post",
                "title": "A Post",
                "author": "Jane",
                "source": "Reader RSS",
                "category": "rss",
                "location": "later",
                "tags": {"review": {"name": "review", "type": "manual", "created": 1}},
                "site_name": "Example Blog",
                "summary": "About things",
                "created_at": "2025-03-04T10:00:00.123456+00:00",
                "updated_at": "2025-03-05T10:00:00+00:00"
            },
            {
                "id": "second",
                "url": "https://read.readwise.io/read/second",
                "source_url": null,
                "title": null,
                "category": "article",
                "location": "somewhere-new",
                "tags": null
            }
        ]
    }"#;

    #[test]
    fn test_parse_list_page() {
        let page = parse_list_page(PAGE).unwrap();
        assert_eq!(page.next.as_deref(), Some("01h6"));
        assert_eq!(page.entries.len(), 2);

        let first = page.entries[0].as_ref().unwrap();
        assert_eq!(first.id, "01gwfvp9pyaabcdgmx14f6ha0");
        assert_eq!(first.url, "https://example.com/post");
        assert_eq!(first.location, Some(Location::Later));
        assert!(first.has_tag("review"));
        assert_eq!(first.site_name.as_deref(), Some("Example Blog"));
        assert_eq!(first.source.as_deref(), Some("Reader RSS"));
        assert!(first.created_at.is_some());

        let second = page.entries[1].as_ref().unwrap();
        assert_eq!(second.url, "https://read.readwise.io/read/second");
        assert_eq!(second.location, None);
        assert!(second.tags.is_empty());
    }

    #[test]
    fn test_parse_list_page_last_page() {
        let page = parse_list_page(r#"{"count": 0, "nextPageCursor": null, "results": []}"#).unwrap();
        assert!(page.next.is_none());
        assert!(page.entries.is_empty());
    }

    #[test]
    fn test_parse_list_page_malformed_element_keeps_prefix() {
        let body = r#"{"nextPageCursor": "x", "results": [
            {"id": "ok", "source_url": "https://a.example"},
            {"id": "bad", "created_at": "yesterday-ish"},
            {"id": "after"}
        ]}"#;
        let page = parse_list_page(body).unwrap();
        assert_eq!(page.entries.len(), 2);
        assert!(page.entries[0].is_ok());
        assert!(matches!(
            page.entries[1],
            Err(FetchError::MalformedElement { index: 1, .. })
        ));
    }

    #[test]
    fn test_parse_list_page_truncated_body() {
        let err = parse_list_page(r#"{"results": [{"id": "a""#).unwrap_err();
        assert!(matches!(err, FetchError::MalformedPage(_)));
    }

    #[test]
    fn test_tag_list_shapes() {
        let body = r#"{"results": [
            {"id": "a", "tags": ["x", "y"]},
            {"id": "b", "tags": [{"name": "z"}]}
        ]}"#;
        let page = parse_list_page(body).unwrap();
        let a = page.entries[0].as_ref().unwrap();
        let b = page.entries[1].as_ref().unwrap();
        assert!(a.has_tag("x") && a.has_tag("y"));
        assert!(b.has_tag("z"));
    }

    #[test]
    fn test_save_request_body() {
        let tags = vec!["podcast".to_string(), "friday".to_string()];
        let body = SaveRequest {
            url: "https://pca.st/episode/abc",
            title: Some("Ep 1"),
            summary: None,
            author: None,
            tags: &tags,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["url"], "https://pca.st/episode/abc");
        assert_eq!(json["title"], "Ep 1");
        assert!(json.get("summary").is_none());
        assert_eq!(json["tags"][1], "friday");
    }
}
