//! Pocket Casts starred episodes source.
//!
//! Logs in with email and password, then lists the starred episodes in a
//! single request. Show notes come from a separate cache endpoint, one episode
//! at a time; an episode whose notes cannot be loaded is kept without them.

use super::{decode_elements, paginate, Page, Query, Source};
use crate::error::FetchError;
use crate::models::Item;
use chrono::{DateTime, Utc};
use futures::Stream;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

const API_BASE: &str = "https://api.pocketcasts.com";
const SHOW_NOTES_BASE: &str = "https://cache.pocketcasts.com/episode/show_notes";
/// Public share link for an episode; this is the URL saved to Reader.
pub const EPISODE_SHARE_BASE: &str = "https://pca.st/episode";

#[derive(Debug, Clone)]
pub struct PocketCastsClient {
    http: Client,
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    scope: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct StarredResponse {
    #[serde(default)]
    episodes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Episode {
    #[serde(default)]
    uuid: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    podcast_title: Option<String>,
    /// Kept as text: a date we cannot read should not cost us the episode.
    #[serde(default)]
    published: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShowNotes {
    #[serde(default)]
    show_notes: Option<String>,
}

impl From<Episode> for Item {
    fn from(ep: Episode) -> Self {
        let url = if ep.uuid.is_empty() {
            String::new()
        } else {
            format!("{EPISODE_SHARE_BASE}/{}", ep.uuid)
        };
        Item {
            id: ep.uuid,
            title: ep.title,
            url,
            author: ep.podcast_title,
            created_at: ep
                .published
                .as_deref()
                .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
                .map(|p| p.with_timezone(&Utc)),
            category: Some("podcast".to_string()),
            ..Default::default()
        }
    }
}

fn parse_starred(body: &str) -> Result<Vec<Result<Item, FetchError>>, FetchError> {
    let starred: StarredResponse = serde_json::from_str(body).map_err(FetchError::MalformedPage)?;
    Ok(decode_elements::<Episode, _>(starred.episodes, Item::from))
}

impl PocketCastsClient {
    pub fn new(http: Client, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            http,
            email: email.into(),
            password: password.into(),
        }
    }

    #[instrument(level = "info", skip(self))]
    async fn login(&self) -> Result<String, FetchError> {
        let resp = self
            .http
            .post(format!("{API_BASE}/user/login"))
            .json(&LoginRequest {
                email: &self.email,
                password: &self.password,
                scope: "webplayer",
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(FetchError::Login(format!("status {}", resp.status())));
        }
        let login: LoginResponse = resp.json().await?;
        info!("Logged in to Pocket Casts");
        Ok(login.token)
    }

    #[instrument(level = "debug", skip(self))]
    async fn show_notes(&self, uuid: &str) -> Result<Option<String>, FetchError> {
        let notes: ShowNotes = self
            .http
            .get(format!("{SHOW_NOTES_BASE}/{uuid}"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(notes.show_notes.filter(|n| !n.trim().is_empty()))
    }

    #[instrument(level = "info", skip(self))]
    async fn starred_page(&self) -> Result<Page, FetchError> {
        let token = self.login().await?;
        let body = self
            .http
            .post(format!("{API_BASE}/user/starred"))
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&serde_json::json!({}))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut entries = parse_starred(&body)?;
        debug!(count = entries.len(), "Decoded starred episodes");

        for item in entries.iter_mut().flatten() {
            if !item.is_identifiable() {
                continue;
            }
            match self.show_notes(&item.id).await {
                Ok(notes) => item.summary = notes,
                Err(e) => warn!(
                    uuid = %item.id,
                    title = %item.display_title(),
                    error = %e,
                    "Could not load show notes; continuing without them"
                ),
            }
        }

        Ok(Page {
            entries,
            next: None,
        })
    }
}

impl Source for PocketCastsClient {
    fn name(&self) -> &'static str {
        "pocketcasts"
    }

    /// The starred list has no filters; the query is ignored.
    fn fetch(&self, _query: &Query) -> impl Stream<Item = Result<Item, FetchError>> + 'static {
        let client = self.clone();
        paginate(move |_cursor| {
            let client = client.clone();
            async move { client.starred_page().await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_starred() {
        let body = r#"{"episodes": [
            {
                "uuid": "a1b2",
                "title": "Episode One",
                "podcastTitle": "The Show",
                "published": "2025-01-10T05:00:00Z",
                "duration": 3600
            },
            {"uuid": "c3d4", "title": null, "published": "last tuesday"}
        ]}"#;
        let entries = parse_starred(body).unwrap();
        assert_eq!(entries.len(), 2);

        let first = entries[0].as_ref().unwrap();
        assert_eq!(first.id, "a1b2");
        assert_eq!(first.url, "https://pca.st/episode/a1b2");
        assert_eq!(first.title.as_deref(), Some("Episode One"));
        assert_eq!(first.author.as_deref(), Some("The Show"));
        assert_eq!(first.category.as_deref(), Some("podcast"));

        assert!(first.created_at.is_some());

        let second = entries[1].as_ref().unwrap();
        assert_eq!(second.display_title(), "https://pca.st/episode/c3d4");
        assert!(second.created_at.is_none());
    }

    #[test]
    fn test_episode_without_uuid_has_no_url() {
        let entries = parse_starred(r#"{"episodes": [{"title": "Mystery"}]}"#).unwrap();
        let item = entries[0].as_ref().unwrap();
        assert!(!item.is_identifiable());
        assert!(item.url.is_empty());
    }

    #[test]
    fn test_parse_starred_empty() {
        assert!(parse_starred("{}").unwrap().is_empty());
        assert!(parse_starred("not json").is_err());
    }
}
