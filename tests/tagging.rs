use chrono::{Local, TimeZone};
use httpmock::prelude::*;
use httpmock::Method::HEAD;
use lofty::file::TaggedFileExt;
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;

use streamcast::config::Config;
use streamcast::error::Error;
use streamcast::extractor::MetadataExtractor;
use streamcast::tagging::{fetch_cover, write_tags, Cover, EpisodeTags};
use tempfile::TempDir;

fn write_mp3(path: &Path, frames: usize) {
    let mut frame = vec![0u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
    let data: Vec<u8> = (0..frames).flat_map(|_| frame.clone()).collect();
    fs::write(path, data).unwrap();
}

fn tags() -> EpisodeTags {
    EpisodeTags {
        episode_title: "Folge 12".to_string(),
        show_title: "Nachtradio".to_string(),
        station_name: "Deutschlandfunk".to_string(),
        start_time: Local.with_ymd_and_hms(2023, 6, 1, 22, 0, 0).unwrap(),
        duration_secs: 5400,
    }
}

#[test]
fn test_gif_logo_is_skipped_without_download() {
    let server = MockServer::start();
    let head = server.mock(|when, then| {
        when.method(HEAD).path("/logo.gif");
        then.status(200).header("content-type", "image/gif");
    });
    let get = server.mock(|when, then| {
        when.method(GET).path("/logo.gif");
        then.status(200)
            .header("content-type", "image/gif")
            .body("GIF89a");
    });

    let cover = fetch_cover(&Client::new(), &server.url("/logo.gif")).unwrap();

    assert!(cover.is_none());
    head.assert();
    get.assert_hits(0);
}

#[test]
fn test_png_logo_is_downloaded() {
    let server = MockServer::start();
    let head = server.mock(|when, then| {
        when.method(HEAD).path("/logo.png");
        then.status(200).header("content-type", "image/png");
    });
    let get = server.mock(|when, then| {
        when.method(GET).path("/logo.png");
        then.status(200)
            .header("content-type", "image/png")
            .body("\u{89}PNG fake");
    });

    let cover = fetch_cover(&Client::new(), &server.url("/logo.png"))
        .unwrap()
        .expect("png logo should be embedded");

    head.assert();
    get.assert();
    assert_eq!(cover.mime_type, "image/png");
    assert_eq!(cover.data, "\u{89}PNG fake".as_bytes());
}

#[test]
fn test_missing_logo_is_a_logo_fetch_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(HEAD).path("/gone.png");
        then.status(404);
    });

    let err = fetch_cover(&Client::new(), &server.url("/gone.png")).unwrap_err();
    assert!(matches!(err, Error::LogoFetch { .. }), "got {}", err);
}

#[test]
fn test_written_tags_are_read_back() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("episode.mp3");
    write_mp3(&path, 40);

    let cover = Cover {
        mime_type: "image/png".to_string(),
        data: b"\x89PNG fake".to_vec(),
    };
    write_tags(&path, &tags(), Some(&cover)).unwrap();

    let cfg: Config = toml::from_str(&format!(
        r#"
[settings]
destination = "{}"

[feed]
title = "Radio"
base_url = "http://example.org/radio/"
"#,
        tmp.path().display()
    ))
    .unwrap();
    let metadata = MetadataExtractor::new(&cfg).extract(&path).unwrap();

    assert_eq!(metadata.title, "Folge 12");
    assert_eq!(metadata.show, "Nachtradio");
    assert_eq!(metadata.artist, "Deutschlandfunk");
    assert_eq!(metadata.copyright, "Deutschlandfunk");
    assert_eq!(metadata.playtime_secs, 5400);
    assert!(metadata.date.starts_with("2023-06-01"), "date {}", metadata.date);
    assert_eq!(
        metadata.description,
        "Show: Nachtradio\nEpisode: Folge 12\nCopyright: 2023 Deutschlandfunk"
    );

    let tagged = lofty::read_from_path(&path).unwrap();
    let tag = tagged.primary_tag().unwrap();
    assert_eq!(tag.pictures().len(), 1);
}
