//! Delivering a finished text report to stdout or a file.

use crate::utils::ensure_parent_dir;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Write `text` to `path`, or print it when no path is given.
///
/// In a dry run the report is printed instead of written, so nothing on disk
/// changes.
#[instrument(level = "info", skip(text), fields(len = text.len()))]
pub async fn write_report(text: &str, path: Option<&Path>, dry_run: bool) -> io::Result<()> {
    let Some(path) = path else {
        print!("{text}");
        return Ok(());
    };

    if dry_run {
        info!(path = %path.display(), dry_run, "Would write report");
        print!("{text}");
        return Ok(());
    }

    ensure_parent_dir(path).await?;
    fs::write(path, text).await?;
    info!(path = %path.display(), "Report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_file_and_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("links.md");

        write_report("- [a](b)\n", Some(&path), false).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "- [a](b)\n");
    }

    #[tokio::test]
    async fn test_dry_run_leaves_disk_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        write_report("x\n", Some(&path), true).await.unwrap();

        assert!(!path.exists());
    }
}
