//! Sinks: where a command delivers each new item.
//!
//! A sink handles one item per call and reports success or failure for that
//! item alone. Nothing is batched, so a failure never takes other items down
//! with it.
//!
//! | Sink | Module | Effect |
//! |------|--------|--------|
//! | [`ReaderSave`] | [`reader`] | creates a Reader document |
//! | [`ReaderTagger`] | [`reader`] | adds a tag to an existing Reader document |
//! | [`TodoistTasks`] | [`todoist`] | creates a Todoist task |
//! | [`Browser`] | [`browser`] | opens the item URL in a browser tab |
//! | [`LineSink`] | [`lines`] | renders one text line per item |

pub mod browser;
pub mod lines;
pub mod reader;
pub mod todoist;

pub use browser::Browser;
pub use lines::LineSink;
pub use reader::{ReaderSave, ReaderTagger};
pub use todoist::TodoistTasks;

use crate::error::ForwardError;
use crate::models::Item;

/// A destination for items.
pub trait Sink {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// One-line description of what [`Sink::forward`] would do with `item`.
    fn preview(&self, item: &Item) -> String;

    /// Deliver one item.
    async fn forward(&mut self, item: &Item) -> Result<(), ForwardError>;

    /// Whether forwarding changes anything outside this process. Dry runs skip
    /// forwarding only for sinks that do.
    fn writes(&self) -> bool {
        true
    }
}
