//! Mastodon bookmarks source.
//!
//! Reads `GET /api/v1/bookmarks` with a bearer token, 40 statuses per page,
//! following the `rel="next"` URL of the `Link` response header.
//!
//! Each status becomes an [`Item`] whose title is the author's display name
//! followed by the first 100 characters of the post text. Boosts point at the
//! boosted status.

use super::{decode_elements, paginate, Page, Query, Source};
use crate::error::{ConfigError, FetchError};
use crate::models::Item;
use crate::utils::{html_to_text, next_link};
use chrono::{DateTime, Utc};
use futures::Stream;
use reqwest::header::{AUTHORIZATION, LINK};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

const PAGE_LIMIT: u32 = 40;
const TITLE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct MastodonClient {
    http: Client,
    token: String,
    bookmarks_url: Url,
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(default)]
    username: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    account: Option<Account>,
    #[serde(default)]
    reblog: Option<Box<Status>>,
}

impl Status {
    fn link(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or(self.uri.as_deref())
            .filter(|u| !u.is_empty())
    }
}

impl From<Status> for Item {
    fn from(status: Status) -> Self {
        let url = status
            .reblog
            .as_deref()
            .and_then(Status::link)
            .or(status.link())
            .unwrap_or_default()
            .to_string();

        let html = match (&status.reblog, status.content.is_empty()) {
            (Some(boosted), true) => boosted.content.as_str(),
            _ => status.content.as_str(),
        };
        let text = html_to_text(html);

        let name = status
            .account
            .as_ref()
            .map(|a| {
                if a.display_name.trim().is_empty() {
                    a.username.clone()
                } else {
                    a.display_name.clone()
                }
            })
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        let title = if text.is_empty() {
            format!("Post by {name}")
        } else if text.chars().count() > TITLE_PREVIEW_CHARS {
            let preview: String = text.chars().take(TITLE_PREVIEW_CHARS).collect();
            format!("{name}: {preview}...")
        } else {
            format!("{name}: {text}")
        };

        Item {
            id: status.id,
            title: Some(title),
            url,
            summary: (!text.is_empty()).then_some(text),
            author: Some(name),
            created_at: status.created_at,
            ..Default::default()
        }
    }
}

impl MastodonClient {
    /// `instance` is the base URL of the server, e.g. `https://mastodon.social`.
    pub fn new(http: Client, instance: &str, token: impl Into<String>) -> Result<Self, ConfigError> {
        let invalid = |source| ConfigError::InvalidUrl {
            url: instance.to_string(),
            source,
        };
        let mut bookmarks_url = Url::parse(instance)
            .map_err(invalid)?
            .join("/api/v1/bookmarks")
            .map_err(invalid)?;
        bookmarks_url
            .query_pairs_mut()
            .append_pair("limit", &PAGE_LIMIT.to_string());
        Ok(Self {
            http,
            token: token.into(),
            bookmarks_url,
        })
    }

    #[instrument(level = "debug", skip(self))]
    async fn bookmarks_page(&self, next: Option<String>) -> Result<Page, FetchError> {
        let url = next.unwrap_or_else(|| self.bookmarks_url.to_string());
        let resp = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?
            .error_for_status()?;

        let next = resp
            .headers()
            .get(LINK)
            .and_then(|h| h.to_str().ok())
            .and_then(next_link);
        let body = resp.text().await?;
        debug!(bytes = body.len(), has_next = next.is_some(), "Received bookmarks page");
        parse_bookmarks_page(&body, next)
    }
}

fn parse_bookmarks_page(body: &str, next: Option<String>) -> Result<Page, FetchError> {
    let statuses: Vec<Value> = serde_json::from_str(body).map_err(FetchError::MalformedPage)?;
    Ok(Page {
        entries: decode_elements::<Status, _>(statuses, Item::from),
        next,
    })
}

impl Source for MastodonClient {
    fn name(&self) -> &'static str {
        "mastodon"
    }

    /// Bookmarks have no server-side filters; the query is ignored.
    fn fetch(&self, _query: &Query) -> impl Stream<Item = Result<Item, FetchError>> + 'static {
        let client = self.clone();
        paginate(move |next| {
            let client = client.clone();
            async move { client.bookmarks_page(next).await }
        })
    }
}
