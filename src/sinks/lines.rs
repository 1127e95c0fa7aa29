//! Collects one rendered line per item for printing or exporting.
//!
//! Rendering has no outside effect, so this sink also runs during dry runs;
//! the command decides afterwards whether the lines go to stdout or a file.

use super::Sink;
use crate::error::ForwardError;
use crate::models::Item;
use crate::outputs::links::{format_line, LineFormat};

#[derive(Debug)]
pub struct LineSink {
    format: LineFormat,
    lines: Vec<String>,
}

impl LineSink {
    pub fn new(format: LineFormat) -> Self {
        Self {
            format,
            lines: Vec::new(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl Sink for LineSink {
    fn name(&self) -> &'static str {
        "lines"
    }

    fn preview(&self, item: &Item) -> String {
        format_line(item, self.format)
    }

    async fn forward(&mut self, item: &Item) -> Result<(), ForwardError> {
        self.lines.push(format_line(item, self.format));
        Ok(())
    }

    fn writes(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collects_lines_in_order() {
        let mut sink = LineSink::new(LineFormat::Title);
        for title in ["one", "two"] {
            let item = Item {
                id: title.to_string(),
                title: Some(title.to_string()),
                ..Default::default()
            };
            sink.forward(&item).await.unwrap();
        }
        assert_eq!(sink.lines(), ["one", "two"]);
        assert!(!sink.writes());
        assert_eq!(sink.into_lines().len(), 2);
    }
}
