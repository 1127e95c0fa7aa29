//! Reader sinks: save new documents, or tag existing ones.

use super::Sink;
use crate::error::ForwardError;
use crate::models::Item;
use crate::sources::reader::ReaderClient;
use itertools::Itertools;

/// Saves each item as a new Reader document carrying a fixed tag set.
#[derive(Debug)]
pub struct ReaderSave {
    client: ReaderClient,
    tags: Vec<String>,
}

impl ReaderSave {
    pub fn new(client: ReaderClient, tags: Vec<String>) -> Self {
        Self { client, tags }
    }
}

impl Sink for ReaderSave {
    fn name(&self) -> &'static str {
        "reader-save"
    }

    fn preview(&self, item: &Item) -> String {
        format!("save {} to Reader with tags [{}]", item.url, self.tags.join(", "))
    }

    async fn forward(&mut self, item: &Item) -> Result<(), ForwardError> {
        if item.url.is_empty() {
            return Err(ForwardError::MissingUrl);
        }
        self.client
            .save(
                &item.url,
                item.title.as_deref(),
                item.summary.as_deref(),
                item.author.as_deref(),
                &self.tags,
            )
            .await
    }
}

/// Adds one tag to existing Reader documents, keeping the tags they have.
#[derive(Debug)]
pub struct ReaderTagger {
    client: ReaderClient,
    tag: String,
}

impl ReaderTagger {
    pub fn new(client: ReaderClient, tag: impl Into<String>) -> Self {
        Self {
            client,
            tag: tag.into(),
        }
    }

    /// The full tag list to send: current tags plus the target, no duplicates.
    pub fn merged_tags(&self, item: &Item) -> Vec<String> {
        item.tags
            .iter()
            .cloned()
            .chain(std::iter::once(self.tag.clone()))
            .unique()
            .collect()
    }
}

impl Sink for ReaderTagger {
    fn name(&self) -> &'static str {
        "reader-tag"
    }

    fn preview(&self, item: &Item) -> String {
        let current = if item.tags.is_empty() {
            "none".to_string()
        } else {
            item.tags.iter().join(", ")
        };
        format!(
            "category {}; tags {} -> {}",
            item.category.as_deref().unwrap_or("N/A"),
            current,
            self.merged_tags(item).join(", ")
        )
    }

    async fn forward(&mut self, item: &Item) -> Result<(), ForwardError> {
        let tags = self.merged_tags(item);
        self.client.update_tags(&item.id, &tags).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;

    fn tagger(tag: &str) -> ReaderTagger {
        ReaderTagger::new(ReaderClient::new(Client::new(), "t"), tag)
    }

    fn item(tags: &[&str]) -> Item {
        Item {
            id: "doc".to_string(),
            url: "https://example.com".to_string(),
            category: Some("article".to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_merged_tags_appends_target() {
        let t = tagger("review");
        assert_eq!(t.merged_tags(&item(&["a", "b"])), vec!["a", "b", "review"]);
    }

    #[test]
    fn test_merged_tags_never_duplicates() {
        let t = tagger("review");
        assert_eq!(t.merged_tags(&item(&["review", "z"])), vec!["review", "z"]);
    }

    #[test]
    fn test_tagger_preview() {
        let t = tagger("watch");
        assert_eq!(
            t.preview(&item(&[])),
            "category article; tags none -> watch"
        );
    }

    #[tokio::test]
    async fn test_save_without_url_fails_before_request() {
        let mut sink = ReaderSave::new(ReaderClient::new(Client::new(), "t"), vec![]);
        let err = sink.forward(&Item::default()).await.unwrap_err();
        assert!(matches!(err, ForwardError::MissingUrl));
    }
}
