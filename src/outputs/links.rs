//! One-line renderings of an item: plain title, Markdown link or org-mode link.

use crate::models::Item;

/// Output syntax for link lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    /// The bare title.
    Title,
    /// `- [title](url) *[label]*`
    Markdown,
    /// `- [[url][title]] /[label]/`
    Org,
}

/// Media label for links to podcasts and videos.
pub fn media_label(item: &Item) -> Option<&'static str> {
    let url = item.url.as_str();
    let category = item.category.as_deref();
    if category == Some("podcast") || url.contains("pocketcasts.com") || url.contains("pca.st") {
        return Some("Podcast");
    }
    if category == Some("video") || url.contains("youtube.com") || url.contains("youtu.be") {
        return Some("YouTube");
    }
    None
}

pub fn format_line(item: &Item, format: LineFormat) -> String {
    let title = item.display_title();
    let label = media_label(item);
    match format {
        LineFormat::Title => title.to_string(),
        LineFormat::Markdown => {
            let suffix = label.map(|l| format!(" *[{l}]*")).unwrap_or_default();
            format!("- [{}]({}){}", title, item.url, suffix)
        }
        LineFormat::Org => {
            let suffix = label.map(|l| format!(" /[{l}]/")).unwrap_or_default();
            format!("- [[{}][{}]]{}", item.url, title, suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: Option<&str>, url: &str, category: Option<&str>) -> Item {
        Item {
            id: "1".to_string(),
            title: title.map(str::to_string),
            url: url.to_string(),
            category: category.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_markdown_line() {
        let it = item(Some("A Post"), "https://example.com/a", Some("article"));
        assert_eq!(
            format_line(&it, LineFormat::Markdown),
            "- [A Post](https://example.com/a)"
        );
    }

    #[test]
    fn test_org_line_with_label() {
        let it = item(Some("Talk"), "https://www.youtube.com/watch?v=x", None);
        assert_eq!(
            format_line(&it, LineFormat::Org),
            "- [[https://www.youtube.com/watch?v=x][Talk]] /[YouTube]/"
        );
    }

    #[test]
    fn test_podcast_label_and_url_as_title() {
        let it = item(None, "https://pca.st/episode/abc", None);
        assert_eq!(
            format_line(&it, LineFormat::Markdown),
            "- [https://pca.st/episode/abc](https://pca.st/episode/abc) *[Podcast]*"
        );
        assert_eq!(media_label(&item(None, "https://x", Some("podcast"))), Some("Podcast"));
    }

    #[test]
    fn test_title_line() {
        let it = item(Some("Plain"), "https://example.com", None);
        assert_eq!(format_line(&it, LineFormat::Title), "Plain");
    }
}
