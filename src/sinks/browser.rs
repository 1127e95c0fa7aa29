//! Opens item URLs in a browser.
//!
//! The browser is started as a child process (`firefox --new-tab <url>` by
//! default) and not waited on: a browser that is not running yet stays in the
//! foreground until it is closed.

use super::Sink;
use crate::error::ForwardError;
use crate::models::Item;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Browser {
    command: String,
    args: Vec<String>,
}

impl Browser {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    fn command_line(&self, url: &str) -> String {
        let mut parts = vec![self.command.as_str()];
        parts.extend(self.args.iter().map(String::as_str));
        parts.push(url);
        parts.join(" ")
    }
}

impl Sink for Browser {
    fn name(&self) -> &'static str {
        "browser"
    }

    fn preview(&self, item: &Item) -> String {
        format!("open `{}`", self.command_line(&item.url))
    }

    async fn forward(&mut self, item: &Item) -> Result<(), ForwardError> {
        if item.url.is_empty() {
            return Err(ForwardError::MissingUrl);
        }
        let child = Command::new(&self.command)
            .args(&self.args)
            .arg(&item.url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ForwardError::Launch {
                command: self.command.clone(),
                source,
            })?;
        debug!(pid = ?child.id(), url = %item.url, "Browser launched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str) -> Item {
        Item {
            id: "1".to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_preview_shows_full_command() {
        let b = Browser::new("firefox", vec!["--new-tab".to_string()]);
        assert_eq!(
            b.preview(&item("https://example.com")),
            "open `firefox --new-tab https://example.com`"
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_forward_error() {
        let mut b = Browser::new("definitely-not-a-browser-7f3a", vec![]);
        let err = b.forward(&item("https://example.com")).await.unwrap_err();
        assert!(matches!(err, ForwardError::Launch { .. }));
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let mut b = Browser::new("true", vec![]);
        let err = b.forward(&item("")).await.unwrap_err();
        assert!(matches!(err, ForwardError::MissingUrl));
    }
}
