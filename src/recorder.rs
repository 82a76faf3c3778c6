//! Time-bounded stream capture.
//!
//! The recorder copies an HTTP audio stream into a temporary file until the
//! requested duration has elapsed, then copies the file into the
//! destination layout
//!
//! ```text
//! <destination>/<station>/<show>/<episode>_<timestamp>.mp3
//! ```
//!
//! and stamps ID3 tags onto it. A failure while streaming removes the
//! temporary file and leaves nothing in the destination. A failure while
//! tagging is logged; the recording is still returned.
//!
//! The duration is checked between reads only. A stalled stream blocks the
//! recorder until data arrives, unless `settings.read_timeout_secs` is set.

use chrono::{DateTime, Local};
use reqwest::blocking::Client;
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{CaptureJob, CapturedFile};
use crate::tagging::{self, EpisodeTags};

const LOGO_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Where a capture currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Streaming,
    Finalizing,
    Tagged,
    Failed,
}

pub struct Recorder<'a> {
    config: &'a Config,
    stream_client: Client,
    logo_client: Client,
    temp_dir: PathBuf,
    phase: CapturePhase,
}

impl<'a> Recorder<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        let read_timeout = config.settings.read_timeout_secs.map(Duration::from_secs);
        let stream_client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(read_timeout)
            .build()?;
        let logo_client = Client::builder()
            .timeout(Duration::from_secs(LOGO_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            config,
            stream_client,
            logo_client,
            temp_dir: std::env::temp_dir(),
            phase: CapturePhase::Idle,
        })
    }

    /// Directory for the in-progress file. Defaults to the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// The in-progress file, unique per process.
    pub fn temp_path(&self) -> PathBuf {
        self.temp_dir
            .join(format!("streamcast_{}.mp3", std::process::id()))
    }

    /// Records `job` and returns the tagged file.
    pub fn capture(&mut self, job: &CaptureJob) -> Result<CapturedFile> {
        if job.duration_secs < 1 {
            return Err(Error::invalid(format!(
                "Length of '{}' is not a valid recording duration. Use a value of at least 1 second.",
                job.duration_secs
            )));
        }
        if !job.destination.is_dir() {
            return Err(Error::invalid(format!(
                "Destination {} is not an existing directory",
                job.destination.display()
            )));
        }

        info!(
            episode = %job.episode_title,
            station = %job.station.name,
            duration_secs = job.duration_secs,
            destination = %job.destination.display(),
            "capture started"
        );

        let start_time = Local::now();
        let started = Instant::now();
        let temp = self.temp_path();

        self.phase = CapturePhase::Streaming;
        if let Err(e) = self.write_stream_to_file(job, &temp, started) {
            error!(error = %e, "could not complete capturing");
            remove_quietly(&temp);
            self.phase = CapturePhase::Failed;
            return Err(e);
        }

        self.phase = CapturePhase::Finalizing;
        let (target, copied) = match self.copy_to_destination(job, &temp, start_time) {
            Ok(placed) => placed,
            Err(e) => {
                error!(error = %e, "could not move recording into place");
                remove_quietly(&temp);
                self.phase = CapturePhase::Failed;
                return Err(e);
            }
        };
        remove_quietly(&temp);

        let tagged = self.add_metadata(job, &target, start_time);
        let bytes = recorded_size(&target, copied);
        self.phase = CapturePhase::Tagged;

        info!(path = %target.display(), bytes, tagged, "capture finished");
        Ok(CapturedFile {
            path: target,
            bytes,
            tagged,
        })
    }

    fn write_stream_to_file(&self, job: &CaptureJob, temp: &Path, started: Instant) -> Result<()> {
        let url = job.station.stream_url.as_str();
        let limit = Duration::from_secs(job.duration_secs);

        let mut file = File::create(temp)?;
        let mut response = self
            .stream_client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::stream(url, e))?;

        let mut buf = vec![0u8; self.config.settings.chunk_size];
        let mut written: u64 = 0;
        loop {
            let n = match response.read(&mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::stream(url, e)),
            };
            if n == 0 {
                return Err(Error::stream(
                    url,
                    format!("stream closed after {} bytes", written),
                ));
            }
            file.write_all(&buf[..n])?;
            written += n as u64;

            if started.elapsed() >= limit {
                break;
            }
        }

        file.flush()?;
        debug!(bytes = written, "stream written to {}", temp.display());
        Ok(())
    }

    fn copy_to_destination(
        &self,
        job: &CaptureJob,
        temp: &Path,
        start_time: DateTime<Local>,
    ) -> Result<(PathBuf, u64)> {
        let target = destination_path(
            &job.destination,
            &job.station.name,
            &job.show_title,
            &job.episode_title,
            start_time,
            &self.config.settings.date_pattern,
        )?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let copied = match fs::copy(temp, &target) {
            Ok(copied) => copied,
            Err(e) => {
                remove_quietly(&target);
                return Err(e.into());
            }
        };
        preserve_mtime(temp, &target);

        Ok((target, copied))
    }

    /// Stamps tags onto the finished file. Failures are logged, never raised.
    fn add_metadata(&self, job: &CaptureJob, path: &Path, start_time: DateTime<Local>) -> bool {
        let cover = job.cover_url.as_deref().and_then(|url| {
            tagging::fetch_cover(&self.logo_client, url)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "station logo not embedded");
                    None
                })
        });

        let tags = EpisodeTags {
            episode_title: job.episode_title.clone(),
            show_title: job.show_title.clone(),
            station_name: job.station.name.clone(),
            start_time,
            duration_secs: job.duration_secs,
        };

        match tagging::write_tags(path, &tags, cover.as_ref()) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "recording kept without tags");
                false
            }
        }
    }
}

/// Computes the final location of a recording. Characters outside
/// `[A-Za-z0-9_. /-]` are stripped from everything below `destination`,
/// and empty or dot-only path segments are dropped so the result always
/// stays under `destination`.
pub fn destination_path(
    destination: &Path,
    station_name: &str,
    show_title: &str,
    episode_title: &str,
    start_time: DateTime<Local>,
    date_pattern: &str,
) -> Result<PathBuf> {
    let mut timestamp = String::new();
    write!(timestamp, "{}", start_time.format(date_pattern))
        .map_err(|_| Error::invalid(format!("Invalid date pattern: '{}'", date_pattern)))?;

    let relative = format!(
        "{}/{}/{}_{}.mp3",
        station_name, show_title, episode_title, timestamp
    );

    let mut target = destination.to_path_buf();
    for segment in sanitize(&relative).split('/') {
        let segment = segment.trim();
        if segment.is_empty() || segment.chars().all(|c| c == '.') {
            continue;
        }
        target.push(segment);
    }
    Ok(target)
}

fn sanitize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | ' ' | '-'))
        .collect()
}

/// Size of the tagged file; the copied length if it cannot be read.
fn recorded_size(path: &Path, copied: u64) -> u64 {
    match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!(error = %e, "could not stat {}", path.display());
            copied
        }
    }
}

fn preserve_mtime(source: &Path, target: &Path) {
    let modified = match fs::metadata(source).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(_) => return,
    };
    let result = OpenOptions::new()
        .write(true)
        .open(target)
        .and_then(|f| f.set_modified(modified));
    if let Err(e) = result {
        debug!(error = %e, "could not preserve modification time");
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, "could not remove {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 21, 5, 7).unwrap()
    }

    #[test]
    fn size_falls_back_to_copied_length() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a.mp3");
        assert_eq!(recorded_size(&path, 417), 417);

        fs::write(&path, [0u8; 10]).unwrap();
        assert_eq!(recorded_size(&path, 417), 10);
    }

    #[test]
    fn builds_template_path() {
        let path = destination_path(
            Path::new("/srv/radio"),
            "Deutschlandfunk",
            "Nachtradio",
            "Folge 1",
            start(),
            "%Y-%m-%d_%H-%M-%S",
        )
        .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/srv/radio/Deutschlandfunk/Nachtradio/Folge 1_2024-03-09_21-05-07.mp3")
        );
    }

    #[test]
    fn strips_disallowed_characters() {
        let path = destination_path(
            Path::new("/srv/radio"),
            "Radio Eins!",
            "Show: Late Night!",
            "Show: Late Night!",
            start(),
            "%Y-%m-%d",
        )
        .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/srv/radio/Radio Eins/Show Late Night/Show Late Night_2024-03-09.mp3")
        );
    }

    #[test]
    fn never_escapes_destination() {
        let path = destination_path(
            Path::new("/srv/radio"),
            "..",
            "../../etc",
            "passwd",
            start(),
            "%Y",
        )
        .unwrap();
        assert!(path.starts_with("/srv/radio"));
        assert!(!path.components().any(|c| c.as_os_str() == ".."));
        assert_eq!(path, PathBuf::from("/srv/radio/etc/passwd_2024.mp3"));
    }

    #[test]
    fn drops_non_ascii() {
        assert_eq!(sanitize("Größe/ü"), "Gre/");
    }

    #[test]
    fn rejects_invalid_date_pattern() {
        let err = destination_path(Path::new("/srv"), "a", "b", "c", start(), "%Q").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
