//! # streamcast
//!
//! Records internet radio streams into tagged MP3 files and publishes them
//! as RSS/iTunes podcast feeds.
//!
//! A capture copies a live HTTP audio stream for a fixed duration into
//! `<destination>/<station>/<show>/<episode>_<timestamp>.mp3` and stamps ID3
//! tags (with the station logo as cover) onto it. A feed run walks the
//! destination tree and writes one feed document per folder.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────┐
//! │  Stream  │──▶│ Recorder │──▶│ destination │
//! │  (HTTP)  │   │ + tagging│   │   *.mp3     │
//! └──────────┘   └──────────┘   └──────┬──────┘
//!                                      │
//!               ┌──────────────────────┘
//!               ▼
//!        ┌─────────────┐   ┌──────────┐   ┌──────────┐
//!        │   Scanner   │──▶│   Feed   │──▶│ rss.xml  │
//!        │ cache+tags  │   │ assembler│   │ per dir  │
//!        └─────────────┘   └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! streamcast stations                                # list configured stations and shows
//! streamcast capture -l 1h -s dlf -b "Nachtradio"    # record one hour
//! streamcast capture -S night                        # record a configured show
//! streamcast feed                                    # regenerate every feed
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error kinds |
//! | [`duration`] | `1h30m` style duration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`recorder`] | Time-bounded stream capture |
//! | [`tagging`] | ID3 tag and cover writing |
//! | [`extractor`] | ID3 metadata extraction |
//! | [`cache`] | Per-process metadata cache |
//! | [`scanner`] | Recursive MP3 discovery |
//! | [`feed`] | Feed assembly and generation runs |
//! | [`rss`] | RSS 2.0 + iTunes serialisation |
//! | [`stations`] | Station and show listing |

pub mod cache;
pub mod config;
pub mod duration;
pub mod error;
pub mod extractor;
pub mod feed;
pub mod logging;
pub mod models;
pub mod recorder;
pub mod rss;
pub mod scanner;
pub mod stations;
pub mod tagging;
