use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use walkdir::WalkDir;

use crate::cache::MetadataCache;
use crate::extractor::MetadataExtractor;
use crate::models::AudioMetadata;

pub const AUDIO_EXTENSION: &str = ".mp3";

/// Collects metadata for every `.mp3` file below `root`, in traversal
/// order. Metadata comes from `cache`, extracting on first sight.
pub fn scan_folder(
    root: &Path,
    extractor: &MetadataExtractor<'_>,
    cache: &MetadataCache,
) -> Result<Vec<Arc<AudioMetadata>>> {
    if !root.is_dir() {
        bail!("Folder does not exist: {}", root.display());
    }
    info!("processing {}", root.display());

    let mut items = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !path.to_string_lossy().ends_with(AUDIO_EXTENSION) {
            continue;
        }

        let metadata = cache
            .get_or_extract(path, |p| extractor.extract(p))
            .with_context(|| format!("Failed to read {}", path.display()))?;
        items.push(metadata);
    }

    Ok(items)
}
