//! Feed assembly.
//!
//! Turns scanned [`AudioMetadata`] into a [`Feed`]: newest first, capped at
//! the configured limit, with per-item logos resolved from the station
//! table. Item links resolve in one order: the file's own link (TCOM tag
//! or configured show), then the station's link, then `feed.about_url`.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::cache::MetadataCache;
use crate::config::Config;
use crate::error::Error;
use crate::extractor::MetadataExtractor;
use crate::models::{AudioMetadata, Enclosure, Feed, FeedImage, FeedItem};
use crate::rss;
use crate::scanner::scan_folder;

pub const MIME_MPEG: &str = "audio/mpeg";

pub struct FeedAssembler<'a> {
    config: &'a Config,
}

impl<'a> FeedAssembler<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Builds a feed titled `title` from `items`, keeping the `limit` most
    /// recent. Items with equal publish dates keep their scan order.
    pub fn build_feed<'m, I>(
        &self,
        title: &str,
        items: I,
        limit: usize,
    ) -> crate::error::Result<Feed>
    where
        I: IntoIterator<Item = &'m AudioMetadata>,
    {
        let mut feed_items = items
            .into_iter()
            .map(|m| self.feed_item(m))
            .collect::<crate::error::Result<Vec<_>>>()?;

        feed_items.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        feed_items.truncate(limit);
        debug!(items = feed_items.len(), "built feed {}", title);

        let feed_config = &self.config.feed;
        let image = feed_config.default_logo_url.as_ref().map(|url| FeedImage {
            url: url.clone(),
            title: feed_config.title.clone(),
            link: Some(feed_config.about_url.clone()),
            description: Some(format!(
                "{}\n\nLogo: {}",
                feed_config.description,
                feed_config.logo_copyright.as_deref().unwrap_or_default()
            )),
        });

        Ok(Feed {
            title: title.to_string(),
            link: feed_config.about_url.clone(),
            description: feed_config.description.clone(),
            language: feed_config.language.clone(),
            generator: generator(),
            last_build_date: Utc::now(),
            items: feed_items,
            image,
        })
    }

    fn feed_item(&self, metadata: &AudioMetadata) -> crate::error::Result<FeedItem> {
        let build_error = |reason: &str| Error::FeedItemBuild {
            file: metadata.path.display().to_string(),
            reason: reason.to_string(),
        };

        if metadata.title.trim().is_empty() {
            return Err(build_error("missing title"));
        }
        let url = metadata
            .url
            .clone()
            .ok_or_else(|| build_error("file lies outside the destination root, no enclosure URL"))?;

        let station = self.config.station_by_name(&metadata.artist);
        let station_link = station.as_ref().and_then(|s| s.link_url.clone());
        let link = metadata
            .link
            .clone()
            .or_else(|| station_link.clone())
            .unwrap_or_else(|| self.config.feed.about_url.clone());

        let logo = station
            .as_ref()
            .and_then(|s| s.logo_url.clone())
            .or_else(|| self.config.feed.default_logo_url.clone());
        let image = logo.map(|url| FeedImage {
            url,
            title: metadata.artist.clone(),
            link: station_link,
            description: None,
        });

        Ok(FeedItem {
            title: metadata.title.clone(),
            link,
            author: metadata.artist.clone(),
            description: metadata.description.clone(),
            pub_date: metadata.pubdate,
            guid: url.clone(),
            enclosure: Enclosure {
                url,
                length: metadata.size,
                mime_type: MIME_MPEG.to_string(),
            },
            duration: format_duration(metadata.playtime_secs),
            image,
        })
    }
}

pub fn generator() -> String {
    format!("streamcast v{}", env!("CARGO_PKG_VERSION"))
}

/// `H:MM:SS`, hours unbounded.
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Feed title for the folder at `relative` below the destination root:
/// the configured title, suffixed with the path segments for subfolders.
pub fn feed_title(base_title: &str, relative: &Path) -> String {
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        base_title.to_string()
    } else {
        format!("{} - {}", base_title, segments.join(" - "))
    }
}

/// Regenerates the feed of the destination root and, unless `root_only`,
/// of every folder below it. Returns the number of feed files written.
pub fn generate_feeds(
    config: &Config,
    cache: &MetadataCache,
    limit: usize,
    root_only: bool,
) -> Result<usize> {
    let root = &config.settings.destination;
    let extractor = MetadataExtractor::new(config);
    let assembler = FeedAssembler::new(config);

    let max_depth = if root_only { 0 } else { usize::MAX };
    let mut folders: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root).max_depth(max_depth) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            folders.push(entry.into_path());
        }
    }

    let mut written = 0;
    for folder in &folders {
        let items = scan_folder(folder, &extractor, cache)?;
        let relative = folder.strip_prefix(root).unwrap_or(Path::new(""));
        let title = feed_title(&config.feed.title, relative);

        let feed = assembler
            .build_feed(&title, items.iter().map(|m| m.as_ref()), limit)
            .with_context(|| format!("Cannot build feed for {}", folder.display()))?;

        let target = folder.join(&config.feed.filename);
        if rss::write_feed(&feed, &target)? {
            written += 1;
        }
    }

    Ok(written)
}
