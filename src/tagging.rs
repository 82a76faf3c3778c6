//! ID3 stamping of captured recordings.
//!
//! Writes the show/episode/station frames a podcast client needs and,
//! when available, embeds the station logo as front cover. Only JPEG and
//! PNG logos are embedded; the content type is checked with a HEAD request
//! before the image is downloaded.

use chrono::{DateTime, Local};
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::{Accessor, ItemKey, Tag, TagExt, TagType};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

/// Values stamped into a captured file.
#[derive(Debug, Clone)]
pub struct EpisodeTags {
    pub episode_title: String,
    pub show_title: String,
    pub station_name: String,
    pub start_time: DateTime<Local>,
    pub duration_secs: u64,
}

impl EpisodeTags {
    pub fn comment(&self) -> String {
        format!(
            "Show: {}\nEpisode: {}\nCopyright: {} {}",
            self.show_title,
            self.episode_title,
            self.start_time.format("%Y"),
            self.station_name
        )
    }
}

/// A downloaded cover image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Cover {
    fn lofty_mime(&self) -> MimeType {
        match self.mime_type.as_str() {
            "image/png" => MimeType::Png,
            _ => MimeType::Jpeg,
        }
    }
}

fn is_embeddable(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    matches!(essence.as_str(), "image/jpeg" | "image/png")
}

/// Fetches a cover image. Returns `Ok(None)` when the server reports a
/// content type other than JPEG or PNG.
pub fn fetch_cover(client: &Client, url: &str) -> Result<Option<Cover>> {
    let logo_error = |reason: String| Error::LogoFetch {
        url: url.to_string(),
        reason,
    };

    let head = client
        .head(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| logo_error(e.to_string()))?;

    let content_type = head
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !is_embeddable(&content_type) {
        debug!(url, content_type = %content_type, "skipping logo with unsupported type");
        return Ok(None);
    }

    let data = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .map_err(|e| logo_error(e.to_string()))?;

    let mime_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    Ok(Some(Cover {
        mime_type,
        data: data.to_vec(),
    }))
}

/// TLEN value in milliseconds, clamped at `u64::MAX`.
fn length_ms(duration_secs: u64) -> u64 {
    duration_secs.saturating_mul(1000)
}

/// Writes ID3v2 frames (and the optional cover) into the MP3 at `path`.
pub fn write_tags(path: &Path, tags: &EpisodeTags, cover: Option<&Cover>) -> Result<()> {
    let tag_error = |reason: String| Error::TagWrite {
        path: path.to_path_buf(),
        reason,
    };

    let tagged_file = lofty::read_from_path(path).map_err(|e| tag_error(e.to_string()))?;
    let mut tag = tagged_file
        .tag(TagType::Id3v2)
        .cloned()
        .unwrap_or_else(|| Tag::new(TagType::Id3v2));

    tag.set_title(tags.episode_title.clone());
    tag.insert_text(
        ItemKey::RecordingDate,
        tags.start_time.format("%Y-%m-%dT%H:%M:%S").to_string(),
    );
    tag.set_genre("Podcast".to_string());
    tag.set_album(tags.show_title.clone());
    tag.insert_text(ItemKey::Length, length_ms(tags.duration_secs).to_string());
    tag.set_artist(tags.station_name.clone());
    tag.insert_text(ItemKey::CopyrightMessage, tags.station_name.clone());
    tag.set_comment(tags.comment());

    if let Some(cover) = cover {
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(cover.lofty_mime()),
            Some("Station logo".to_string()),
            cover.data.clone(),
        ));
    }

    tag.save_to_path(path, WriteOptions::default())
        .map_err(|e| tag_error(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn only_jpeg_and_png_are_embeddable() {
        assert!(is_embeddable("image/jpeg"));
        assert!(is_embeddable("image/png; charset=binary"));
        assert!(is_embeddable("IMAGE/PNG"));
        assert!(!is_embeddable("image/gif"));
        assert!(!is_embeddable("text/html"));
        assert!(!is_embeddable(""));
    }

    #[test]
    fn length_is_clamped_for_huge_durations() {
        assert_eq!(length_ms(5400), 5_400_000);
        assert_eq!(length_ms(u64::MAX / 10), u64::MAX);
    }

    #[test]
    fn comment_names_show_episode_and_year() {
        let tags = EpisodeTags {
            episode_title: "Late Night".to_string(),
            show_title: "Nachtradio".to_string(),
            station_name: "DLF".to_string(),
            start_time: Local.with_ymd_and_hms(2023, 6, 1, 22, 0, 0).unwrap(),
            duration_secs: 60,
        };
        assert_eq!(
            tags.comment(),
            "Show: Nachtradio\nEpisode: Late Night\nCopyright: 2023 DLF"
        );
    }
}
