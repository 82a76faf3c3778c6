//! Process-lifetime metadata cache.
//!
//! Maps a file's absolute path to the metadata extracted on first sight.
//! Entries are written once and never invalidated, so a file changed on
//! disk keeps its original metadata until the process restarts. Feed runs
//! regenerate every folder's feed from the same files; the cache keeps each
//! file parsed only once per run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::models::AudioMetadata;

#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<PathBuf, Arc<AudioMetadata>>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached metadata for `path`, running `extract` only when
    /// the path has not been seen before. If two callers race on a new
    /// path, the first stored value wins and both receive it.
    pub fn get_or_extract<F>(&self, path: &Path, extract: F) -> Result<Arc<AudioMetadata>>
    where
        F: FnOnce(&Path) -> Result<AudioMetadata>,
    {
        let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        if let Some(hit) = self.read_entries().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let metadata = Arc::new(extract(path)?);
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(Arc::clone(entries.entry(key).or_insert(metadata)))
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Arc<AudioMetadata>>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
