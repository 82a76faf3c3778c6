//! # streamcast CLI
//!
//! The `streamcast` binary records radio streams and regenerates podcast
//! feeds from the recordings.
//!
//! ## Usage
//!
//! ```bash
//! streamcast --config ./config/streamcast.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `streamcast capture -l <len> -s <station> -b <broadcast>` | Record a stream for a fixed time |
//! | `streamcast capture -S <show>` | Record a show defined in the config |
//! | `streamcast feed` | Regenerate the feed of every folder below the destination |
//! | `streamcast stations` | List configured stations and shows |
//!
//! ## Examples
//!
//! ```bash
//! # Record 90 minutes of Deutschlandfunk
//! streamcast capture -l 1h30m -s dlf -b "Nachtradio" -t "Folge 12"
//!
//! # Record a configured show into another directory
//! streamcast capture -S night -d /mnt/usb/radio
//!
//! # Rebuild only the top-level feed, keeping 50 items
//! streamcast feed --root-only --limit 50
//! ```

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use streamcast::cache::MetadataCache;
use streamcast::config::{self, Config};
use streamcast::duration::parse_duration;
use streamcast::feed;
use streamcast::logging;
use streamcast::models::CaptureJob;
use streamcast::recorder::Recorder;
use streamcast::stations;

/// streamcast: capture internet radio programs and publish them as podcasts.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/streamcast.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "streamcast",
    about = "Capture internet radio programs broadcast as MP3 and publish them as podcast feeds",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/streamcast.toml`. Stations, shows, feed and
    /// logging settings are read from this file.
    #[arg(long, global = true, default_value = "./config/streamcast.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Record a stream.
    ///
    /// Either name a station, a broadcast title and a length, or pick a
    /// show defined in the configuration with `-S`.
    Capture {
        /// Length of the recording, e.g. `3600`, `45m`, `1h30m`.
        #[arg(short = 'l', long = "length", conflicts_with = "show")]
        length: Option<String>,

        /// Station key as defined under `[stations]`.
        #[arg(short = 's', long = "station", conflicts_with = "show")]
        station: Option<String>,

        /// Title of the broadcast.
        #[arg(short = 'b', long = "broadcast", conflicts_with = "show")]
        broadcast: Option<String>,

        /// Title of the recording. Defaults to the broadcast title.
        #[arg(short = 't', long = "title", conflicts_with = "show")]
        title: Option<String>,

        /// ID of a show defined under `[shows]`.
        #[arg(short = 'S', long = "show")]
        show: Option<String>,

        /// Destination directory, overriding `settings.destination`.
        #[arg(short = 'd', long = "destination")]
        destination: Option<PathBuf>,
    },

    /// Regenerate podcast feeds.
    ///
    /// Writes one feed per folder below the destination that contains
    /// recordings. Folders without recordings keep their old feed file.
    Feed {
        /// Maximum number of items per feed. Defaults to `feed.limit`.
        #[arg(long)]
        limit: Option<usize>,

        /// Only write the feed of the destination root.
        #[arg(long)]
        root_only: bool,
    },

    /// List configured stations and shows.
    Stations,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging)?;
    debug!(config = %cli.config.display(), "configuration loaded");

    match cli.command {
        Commands::Capture {
            length,
            station,
            broadcast,
            title,
            show,
            destination,
        } => {
            if let Some(dir) = destination {
                let dir = config::expand_path(&dir);
                if !dir.is_dir() {
                    bail!("Destination '{}' does not exist.", dir.display());
                }
                cfg.settings.destination = dir;
            }

            let job = match show {
                Some(id) => show_job(&cfg, &id)?,
                None => manual_job(&cfg, length, station, broadcast, title)?,
            };

            let mut recorder = Recorder::new(&cfg)?;
            let captured = recorder.capture(&job)?;
            println!("{}", captured.path.display());
        }
        Commands::Feed { limit, root_only } => {
            cfg.settings.destination = cfg
                .settings
                .destination
                .canonicalize()
                .with_context(|| {
                    format!(
                        "Destination '{}' does not exist",
                        cfg.settings.destination.display()
                    )
                })?;
            let limit = limit.unwrap_or(cfg.feed.limit);
            if limit < 1 {
                bail!("--limit must be >= 1");
            }

            let cache = MetadataCache::new();
            let written = feed::generate_feeds(&cfg, &cache, limit, root_only)?;
            println!("Wrote {} feed(s).", written);
        }
        Commands::Stations => {
            stations::list_stations(&cfg)?;
        }
    }

    Ok(())
}

fn show_job(cfg: &Config, id: &str) -> anyhow::Result<CaptureJob> {
    let Some(show) = cfg.show(id) else {
        bail!(
            "Show '{}' is unknown. Use one of these: {}.",
            id,
            cfg.show_ids().join(", ")
        );
    };
    Ok(CaptureJob::for_show(
        &show,
        cfg.settings.destination.clone(),
        Local::now(),
    ))
}

fn manual_job(
    cfg: &Config,
    length: Option<String>,
    station: Option<String>,
    broadcast: Option<String>,
    title: Option<String>,
) -> anyhow::Result<CaptureJob> {
    let (Some(length), Some(station), Some(broadcast)) = (length, station, broadcast) else {
        bail!("Either -S <show> or all of -l <length>, -s <station> and -b <broadcast> are required.");
    };

    let duration_secs = match parse_duration(&length) {
        Ok(secs) if secs >= 1 => secs,
        _ => bail!(
            "Length of '{}' is not a valid recording duration. Use a value of at least 1 second.",
            length
        ),
    };

    let Some(source) = cfg.station(&station) else {
        bail!(
            "Station '{}' is unknown. Use one of these: {}.",
            station,
            cfg.station_ids().join(", ")
        );
    };

    Ok(CaptureJob {
        cover_url: source.logo_url.clone(),
        station: source,
        episode_title: title.unwrap_or_else(|| broadcast.clone()),
        show_title: broadcast,
        duration_secs,
        destination: cfg.settings.destination.clone(),
    })
}
