//! Rendering of command results.
//!
//! - [`links`]: one-line item renderings (title, Markdown, org-mode)
//! - [`table`]: the feed statistics report
//! - [`report`]: sending finished text to stdout or a file

pub mod links;
pub mod report;
pub mod table;
