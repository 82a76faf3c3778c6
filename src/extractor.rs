//! Metadata extraction from captured MP3 files.
//!
//! Each field is read from a fixed ID3 frame and falls back to a declared
//! default when the frame is missing:
//!
//! | Field | Frame | Default |
//! |-------|-------|---------|
//! | title | TIT2 | file name without extension |
//! | show | TALB | file name without extension |
//! | date | TDRC | extraction time, formatted with `settings.date_pattern` |
//! | artist | TPE1 | show |
//! | playtime | TLEN (ms) | 0 |
//! | copyright | TCOP | artist |
//! | description | COMM | `Show: ..<br>Episode: ..<br>Copyright: YEAR copyright` |
//! | link | TCOM | link of the configured show with that title, if any |
//!
//! A file lofty cannot parse is logged and described by the defaults alone.

use chrono::{DateTime, Local, Utc};
use lofty::file::TaggedFileExt;
use lofty::tag::{Accessor, ItemKey, Tag};
use std::path::Path;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::AudioMetadata;

pub struct MetadataExtractor<'a> {
    config: &'a Config,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Reads metadata for the file at `path`. Only filesystem errors
    /// (missing file, unreadable stat) are returned; tag problems fall back
    /// to defaults.
    pub fn extract(&self, path: &Path) -> Result<AudioMetadata> {
        debug!("Extracting metadata from: {}", path.display());

        let stat = std::fs::metadata(path)?;
        let size = stat.len();
        let pubdate: DateTime<Utc> = stat
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| DateTime::<Utc>::from(std::time::UNIX_EPOCH));

        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let tag = match read_tag(path) {
            Ok(tag) => tag,
            Err(e) => {
                error!(error = %e, "using file defaults");
                None
            }
        };
        let fields = TagFields::from_tag(tag.as_ref());

        let title = fields.title.unwrap_or_else(|| stem.clone());
        let show = fields.show.unwrap_or_else(|| stem.clone());
        let date = fields.date.unwrap_or_else(|| self.default_date());
        let artist = fields.artist.unwrap_or_else(|| show.clone());
        let playtime_secs = fields.length_ms.map(|ms| ms / 1000).unwrap_or(0);
        let copyright = fields.copyright.unwrap_or_else(|| artist.clone());
        let description = fields.comment.unwrap_or_else(|| {
            format!(
                "Show: {}<br>Episode: {}<br>Copyright: {} {}",
                show,
                title,
                date.chars().take(4).collect::<String>(),
                copyright
            )
        });
        let link = fields.link.or_else(|| {
            self.config
                .show_by_title(&show)
                .and_then(|s| s.link_url)
        });

        Ok(AudioMetadata {
            path: path.to_path_buf(),
            basename,
            title,
            show,
            artist,
            date,
            copyright,
            playtime_secs,
            description,
            link,
            size,
            url: self.public_url(path),
            pubdate,
        })
    }

    fn default_date(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        match write!(out, "{}", Local::now().format(&self.config.settings.date_pattern)) {
            Ok(()) => out,
            Err(_) => Local::now().format("%Y-%m-%d").to_string(),
        }
    }

    /// `feed.base_url` plus the percent-encoded path below the destination
    /// root.
    pub fn public_url(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.config.settings.destination).ok()?;
        let encoded: Vec<String> = relative
            .components()
            .map(|c| urlencoding::encode(&c.as_os_str().to_string_lossy()).into_owned())
            .collect();
        Some(join_url(&self.config.feed.base_url, &encoded.join("/")))
    }
}

fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        base.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

fn read_tag(path: &Path) -> Result<Option<Tag>> {
    let tagged_file = lofty::read_from_path(path).map_err(|e| Error::UnreadableAudioHeader {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .cloned();
    Ok(tag)
}

/// Optional ID3 values; `None` means the frame is absent or empty.
#[derive(Debug, Default)]
struct TagFields {
    title: Option<String>,
    show: Option<String>,
    date: Option<String>,
    artist: Option<String>,
    length_ms: Option<u64>,
    copyright: Option<String>,
    comment: Option<String>,
    link: Option<String>,
}

impl TagFields {
    fn from_tag(tag: Option<&Tag>) -> Self {
        let Some(tag) = tag else {
            return Self::default();
        };
        Self {
            title: non_empty(tag.title().map(|s| s.to_string())),
            show: non_empty(tag.album().map(|s| s.to_string())),
            date: non_empty(tag.get_string(&ItemKey::RecordingDate).map(str::to_string)),
            artist: non_empty(tag.artist().map(|s| s.to_string())),
            length_ms: tag
                .get_string(&ItemKey::Length)
                .and_then(|s| s.trim().parse::<u64>().ok()),
            copyright: non_empty(
                tag.get_string(&ItemKey::CopyrightMessage)
                    .map(str::to_string),
            ),
            comment: non_empty(tag.comment().map(|s| s.to_string())),
            link: non_empty(tag.get_string(&ItemKey::Composer).map(str::to_string)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("http://a/", "b/c.mp3"), "http://a/b/c.mp3");
        assert_eq!(join_url("http://a", "b/c.mp3"), "http://a/b/c.mp3");
        assert_eq!(join_url("http://a/", ""), "http://a/");
    }

    #[test]
    fn missing_tag_yields_no_fields() {
        let fields = TagFields::from_tag(None);
        assert!(fields.title.is_none());
        assert!(fields.length_ms.is_none());
    }

    #[test]
    fn reads_fields_from_tag() {
        use lofty::tag::TagType;
        let mut tag = Tag::new(TagType::Id3v2);
        tag.set_title("Episode".to_string());
        tag.set_album("Show".to_string());
        tag.insert_text(ItemKey::Length, "61000".to_string());
        tag.insert_text(ItemKey::Composer, " ".to_string());
        let fields = TagFields::from_tag(Some(&tag));
        assert_eq!(fields.title.as_deref(), Some("Episode"));
        assert_eq!(fields.show.as_deref(), Some("Show"));
        assert_eq!(fields.length_ms, Some(61000));
        assert_eq!(fields.link, None);
        assert_eq!(fields.artist, None);
    }
}
