//! Persistence of processed item identifiers.
//!
//! A [`ProcessedStore`] is an append-only set: an id is added right after its
//! item was forwarded and is never removed. [`FileStore`] keeps the set in a
//! plain text file with one id per line and no header; line order carries no
//! meaning. The unit type `()` is the store for commands that do not track
//! anything.
//!
//! There is no locking. Two concurrent runs of the same command may both
//! forward an item and both append its id.

use crate::error::StoreError;
use crate::utils::ensure_parent_dir;
use std::collections::HashSet;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// A set of identifiers that survives process restarts.
pub trait ProcessedStore {
    /// Whether `id` was recorded by this or an earlier run.
    fn contains(&self, id: &str) -> bool;

    /// Record `id` durably before returning.
    async fn append(&mut self, id: &str) -> Result<(), StoreError>;

    /// Number of recorded ids.
    fn len(&self) -> usize;

    /// `false` for stores that remember nothing; deduplication is skipped.
    fn is_tracking(&self) -> bool {
        true
    }
}

impl ProcessedStore for () {
    fn contains(&self, _id: &str) -> bool {
        false
    }

    async fn append(&mut self, _id: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn len(&self) -> usize {
        0
    }

    fn is_tracking(&self) -> bool {
        false
    }
}

/// Newline-delimited id file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    ids: HashSet<String>,
}

impl FileStore {
    /// Load the ids recorded in `path`. A missing file is an empty set.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let ids = match fs::read_to_string(&path).await {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("State file does not exist yet");
                HashSet::new()
            }
            Err(source) => return Err(StoreError { path, source }),
        };
        info!(count = ids.len(), "Loaded processed ids");
        Ok(Self { path, ids })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProcessedStore for FileStore {
    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id.trim())
    }

    /// Ids are stored trimmed, the same way [`FileStore::load`] reads them
    /// back. An id that is blank or spans lines cannot be stored.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    async fn append(&mut self, id: &str) -> Result<(), StoreError> {
        let id = id.trim();
        if id.is_empty() || id.contains(['\n', '\r']) {
            return Err(StoreError {
                path: self.path.clone(),
                source: io::Error::new(ErrorKind::InvalidInput, format!("unstorable id {id:?}")),
            });
        }
        let wrap = |source| StoreError {
            path: self.path.clone(),
            source,
        };
        ensure_parent_dir(&self.path).await.map_err(wrap)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(wrap)?;
        file.write_all(format!("{id}\n").as_bytes())
            .await
            .map_err(wrap)?;
        file.sync_data().await.map_err(wrap)?;
        self.ids.insert(id.to_string());
        Ok(())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::load(dir.path().join("nothing-here")).await.unwrap();
        assert_eq!(store.len(), 0);
        assert!(!store.contains("a"));
    }

    #[tokio::test]
    async fn test_load_ignores_blank_lines_and_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        std::fs::write(&path, "a\n\n  b  \r\nc").unwrap();

        let store = FileStore::load(&path).await.unwrap();
        assert_eq!(store.len(), 3);
        assert!(store.contains("a"));
        assert!(store.contains("b"));
        assert!(store.contains("c"));
    }

    #[tokio::test]
    async fn test_append_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state");

        let mut store = FileStore::load(&path).await.unwrap();
        store.append("ep-1").await.unwrap();
        store.append("ep-2").await.unwrap();
        assert!(store.contains("ep-1"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "ep-1\nep-2\n");

        let reloaded = FileStore::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("ep-2"));
    }

    #[tokio::test]
    async fn test_append_keeps_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        std::fs::write(&path, "old\n").unwrap();

        let mut store = FileStore::load(&path).await.unwrap();
        store.append("new").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[tokio::test]
    async fn test_ids_are_matched_and_stored_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");

        let mut store = FileStore::load(&path).await.unwrap();
        store.append(" ep-1 ").await.unwrap();
        assert!(store.contains("ep-1"));
        assert!(store.contains("ep-1\n"));

        let reloaded = FileStore::load(&path).await.unwrap();
        assert!(reloaded.contains(" ep-1"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ep-1\n");
    }

    #[tokio::test]
    async fn test_multiline_or_blank_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");

        let mut store = FileStore::load(&path).await.unwrap();
        let err = store.append("a\nb").await.unwrap_err();
        assert_eq!(err.source.kind(), ErrorKind::InvalidInput);
        assert!(store.append("   ").await.is_err());

        assert_eq!(store.len(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unit_store_tracks_nothing() {
        let mut store = ();
        store.append("x").await.unwrap();
        assert!(!store.contains("x"));
        assert!(!store.is_tracking());
        assert_eq!(ProcessedStore::len(&store), 0);
    }
}
