//! Todoist task sink (REST API v2).
//!
//! Every item becomes one task: the title (at most 500 characters) is the task
//! content, and the description lists the summary, author and URL when known.

use super::Sink;
use crate::error::ForwardError;
use crate::models::Item;
use crate::sources::reader::check_status;
use crate::utils::truncate_for_log;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Serialize;
use tracing::instrument;

const TASKS_URL: &str = "https://api.todoist.com/rest/v2/tasks";
const MAX_CONTENT_CHARS: usize = 500;
const UNTITLED: &str = "Untitled Document";

#[derive(Debug)]
pub struct TodoistTasks {
    http: Client,
    token: String,
    labels: Vec<String>,
    due_string: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TaskRequest {
    pub content: String,
    pub description: String,
    pub labels: Vec<String>,
    pub due_string: String,
}

impl TodoistTasks {
    pub fn new(
        http: Client,
        token: impl Into<String>,
        labels: Vec<String>,
        due_string: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token: token.into(),
            labels,
            due_string: due_string.into(),
        }
    }

    pub fn task_for(&self, item: &Item) -> TaskRequest {
        let title = item
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(UNTITLED);
        let mut content: String = title.chars().take(MAX_CONTENT_CHARS).collect();
        if title.chars().count() > MAX_CONTENT_CHARS {
            content.push_str("...");
        }

        let mut description = Vec::new();
        if let Some(summary) = item.summary.as_deref().filter(|s| !s.is_empty()) {
            description.push(format!("Summary: {summary}"));
        }
        if let Some(author) = item.author.as_deref().filter(|a| !a.is_empty()) {
            description.push(format!("Author: {author}"));
        }
        if !item.url.is_empty() {
            description.push(format!("URL: {}", item.url));
        }

        TaskRequest {
            content,
            description: description.join("\n"),
            labels: self.labels.clone(),
            due_string: self.due_string.clone(),
        }
    }
}

impl Sink for TodoistTasks {
    fn name(&self) -> &'static str {
        "todoist"
    }

    fn preview(&self, item: &Item) -> String {
        let task = self.task_for(item);
        format!(
            "create task '{}' due {} labelled [{}]",
            truncate_for_log(&task.content, 100),
            task.due_string,
            task.labels.join(", ")
        )
    }

    #[instrument(level = "debug", skip_all, fields(id = %item.id))]
    async fn forward(&mut self, item: &Item) -> Result<(), ForwardError> {
        let task = self.task_for(item);
        let resp = self
            .http
            .post(TASKS_URL)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&task)
            .send()
            .await?;
        check_status(resp).await
    }
}
