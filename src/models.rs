//! Core data models used throughout streamcast.
//!
//! Stations and shows come from configuration, capture jobs flow into the
//! recorder, and audio metadata flows from the scanner into the feed
//! assembler.

use chrono::{DateTime, Local, Utc};
use std::fmt::Write;
use std::path::PathBuf;

use crate::config::StationConfig;

/// A radio station, keyed by its lower-cased configuration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSource {
    pub key: String,
    pub name: String,
    pub stream_url: String,
    pub logo_url: Option<String>,
    pub link_url: Option<String>,
}

impl StreamSource {
    pub fn from_config(key: &str, station: &StationConfig) -> Self {
        Self {
            key: key.to_string(),
            name: station.name.clone(),
            stream_url: station.stream_url.clone(),
            logo_url: station.logo_url.clone(),
            link_url: station.link_url.clone(),
        }
    }
}

/// A recurring program on a station.
#[derive(Debug, Clone)]
pub struct Show {
    pub id: String,
    pub station: StreamSource,
    pub title: String,
    /// strftime template for episode titles; the show title when absent.
    pub episode_title: Option<String>,
    pub duration_secs: u64,
    pub logo_url: Option<String>,
    pub link_url: Option<String>,
}

/// One recording request. Consumed by a single capture.
#[derive(Debug, Clone)]
pub struct CaptureJob {
    pub station: StreamSource,
    pub show_title: String,
    pub episode_title: String,
    pub duration_secs: u64,
    pub destination: PathBuf,
    pub cover_url: Option<String>,
}

impl CaptureJob {
    /// Builds a job for a configured show, rendering its episode title
    /// template against `now`.
    pub fn for_show(show: &Show, destination: PathBuf, now: DateTime<Local>) -> Self {
        let episode_title = match &show.episode_title {
            Some(template) => {
                let mut rendered = String::new();
                match write!(rendered, "{}", now.format(template)) {
                    Ok(()) => rendered,
                    Err(_) => template.clone(),
                }
            }
            None => show.title.clone(),
        };
        Self {
            station: show.station.clone(),
            show_title: show.title.clone(),
            episode_title,
            duration_secs: show.duration_secs,
            destination,
            cover_url: show.logo_url.clone(),
        }
    }
}

/// A finished, tagged recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFile {
    pub path: PathBuf,
    pub bytes: u64,
    /// False when ID3 stamping failed; the recording itself is intact.
    pub tagged: bool,
}

/// Metadata of one MP3 file, read from its ID3 tags and the filesystem.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioMetadata {
    pub path: PathBuf,
    pub basename: String,
    pub title: String,
    pub show: String,
    pub artist: String,
    /// Recording date as stored in the tag, or the extraction time rendered
    /// with the configured date pattern.
    pub date: String,
    pub copyright: String,
    pub playtime_secs: u64,
    pub description: String,
    pub link: Option<String>,
    pub size: u64,
    /// Public URL; `None` when the file lies outside the destination root.
    pub url: Option<String>,
    /// File modification time; the feed's publish date.
    pub pubdate: DateTime<Utc>,
}

/// `<image>` block shared by channel and items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedImage {
    pub url: String,
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub length: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub author: String,
    pub description: String,
    pub pub_date: DateTime<Utc>,
    pub guid: String,
    pub enclosure: Enclosure,
    /// `H:MM:SS`
    pub duration: String,
    pub image: Option<FeedImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub generator: String,
    pub last_build_date: DateTime<Utc>,
    pub items: Vec<FeedItem>,
    pub image: Option<FeedImage>,
}
