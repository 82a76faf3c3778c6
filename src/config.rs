use anyhow::{bail, Context, Result};
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::duration::parse_duration;
use crate::models::{Show, StreamSource};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub settings: SettingsConfig,
    pub feed: FeedConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub stations: BTreeMap<String, StationConfig>,
    #[serde(default)]
    pub shows: BTreeMap<String, ShowConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    pub destination: PathBuf,
    #[serde(default = "default_date_pattern")]
    pub date_pattern: String,
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_date_pattern() -> String {
    "%Y-%m-%d_%H-%M-%S".to_string()
}
fn default_chunk_size() -> usize {
    10 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub base_url: String,
    #[serde(default)]
    pub about_url: String,
    #[serde(default)]
    pub default_logo_url: Option<String>,
    #[serde(default)]
    pub logo_copyright: Option<String>,
    #[serde(default = "default_feed_filename")]
    pub filename: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
}

fn default_feed_filename() -> String {
    "rss.xml".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_feed_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StationConfig {
    pub name: String,
    pub stream_url: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShowConfig {
    pub station: String,
    pub title: String,
    #[serde(default)]
    pub episode_title: Option<String>,
    pub duration: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
}

impl Config {
    /// Station keys, sorted, for usage messages.
    pub fn station_ids(&self) -> Vec<String> {
        self.stations.keys().cloned().collect()
    }

    pub fn show_ids(&self) -> Vec<String> {
        self.shows.keys().cloned().collect()
    }

    /// Looks a station up by key, ignoring case.
    pub fn station(&self, key: &str) -> Option<StreamSource> {
        let key = key.to_lowercase();
        self.stations
            .get(&key)
            .map(|s| StreamSource::from_config(&key, s))
    }

    /// Looks a station up by its display name, as written into the
    /// artist tag of captured files.
    pub fn station_by_name(&self, name: &str) -> Option<StreamSource> {
        self.stations
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(key, s)| StreamSource::from_config(key, s))
    }

    /// Resolves a configured show together with its station.
    pub fn show(&self, id: &str) -> Option<Show> {
        let show = self.shows.get(id)?;
        let station = self.station(&show.station)?;
        let duration_secs = parse_duration(&show.duration).ok()?;
        Some(Show {
            id: id.to_string(),
            title: show.title.clone(),
            episode_title: show.episode_title.clone(),
            duration_secs,
            logo_url: show.logo_url.clone().or_else(|| station.logo_url.clone()),
            link_url: show.link_url.clone().or_else(|| station.link_url.clone()),
            station,
        })
    }

    /// Finds a configured show by its title, as written into the album tag.
    pub fn show_by_title(&self, title: &str) -> Option<Show> {
        self.shows
            .iter()
            .find(|(_, s)| s.title == title)
            .and_then(|(id, _)| self.show(id))
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.settings.destination = expand_path(&config.settings.destination);
    if let Some(file) = config.logging.file.take() {
        config.logging.file = Some(expand_path(&file));
    }
    config.stations = config
        .stations
        .into_iter()
        .map(|(key, station)| (key.to_lowercase(), station))
        .collect();

    // Validate settings
    if config.settings.chunk_size == 0 {
        bail!("settings.chunk_size must be > 0");
    }
    validate_date_pattern(&config.settings.date_pattern)?;

    // Validate feed
    if config.feed.limit < 1 {
        bail!("feed.limit must be >= 1");
    }
    if config.feed.base_url.trim().is_empty() {
        bail!("feed.base_url must not be empty");
    }
    if config.feed.filename.trim().is_empty() {
        bail!("feed.filename must not be empty");
    }

    // Validate logging
    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => bail!(
            "Unknown log level: '{}'. Must be trace, debug, info, warn, or error.",
            other
        ),
    }
    match config.logging.format.as_str() {
        "compact" | "pretty" | "json" => {}
        other => bail!(
            "Unknown log format: '{}'. Must be compact, pretty, or json.",
            other
        ),
    }

    // Validate shows
    for (id, show) in &config.shows {
        if !config.stations.contains_key(&show.station.to_lowercase()) {
            bail!(
                "shows.{}.station '{}' is unknown. Use one of these: {}.",
                id,
                show.station,
                config.station_ids().join(", ")
            );
        }
        let secs = parse_duration(&show.duration)
            .with_context(|| format!("shows.{}.duration is invalid", id))?;
        if secs < 1 {
            bail!("shows.{}.duration must be at least one second", id);
        }
        if let Some(template) = &show.episode_title {
            validate_date_pattern(template)
                .with_context(|| format!("shows.{}.episode_title is invalid", id))?;
        }
    }

    Ok(config)
}

/// Rejects strftime patterns chrono cannot render.
pub fn validate_date_pattern(pattern: &str) -> Result<()> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        bail!("Invalid date pattern: '{}'", pattern);
    }
    Ok(())
}

/// Expand `~` and `${VAR_NAME}` patterns in a path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = expand_env_vars(&path.to_string_lossy());
    if let Some(rest) = raw.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') {
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(format!("{}{}", home, rest));
            }
        }
    }
    PathBuf::from(raw)
}

/// Expand `${VAR_NAME}` patterns in a string from the process environment.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let end = match result[start..].find('}') {
            Some(pos) => start + pos,
            None => break,
        };
        let var_name = &result[start + 2..end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[end + 1..]);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[settings]
destination = "/srv/radio"

[feed]
title = "Radio"
base_url = "http://example.org/radio/"

[stations.DLF]
name = "Deutschlandfunk"
stream_url = "http://example.org/dlf.mp3"
logo_url = "http://example.org/dlf.png"

[shows.night]
station = "dlf"
title = "Nachtradio"
duration = "1h30m"
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_defaults() {
        let file = write_config(SAMPLE);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.settings.date_pattern, "%Y-%m-%d_%H-%M-%S");
        assert_eq!(config.settings.chunk_size, 10240);
        assert_eq!(config.settings.read_timeout_secs, None);
        assert_eq!(config.feed.filename, "rss.xml");
        assert_eq!(config.feed.limit, 20);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn station_keys_are_case_insensitive() {
        let file = write_config(SAMPLE);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.station_ids(), vec!["dlf".to_string()]);
        let station = config.station("DlF").unwrap();
        assert_eq!(station.name, "Deutschlandfunk");
        assert!(config.station_by_name("Deutschlandfunk").is_some());
    }

    #[test]
    fn show_inherits_station_logo() {
        let file = write_config(SAMPLE);
        let config = load_config(file.path()).unwrap();
        let show = config.show("night").unwrap();
        assert_eq!(show.duration_secs, 5400);
        assert_eq!(show.logo_url.as_deref(), Some("http://example.org/dlf.png"));
        assert_eq!(show.link_url, None);
        assert!(config.show_by_title("Nachtradio").is_some());
    }

    #[test]
    fn rejects_show_with_unknown_station() {
        let file = write_config(&SAMPLE.replace("station = \"dlf\"", "station = \"nope\""));
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("unknown"));
    }

    #[test]
    fn rejects_bad_show_duration() {
        let file = write_config(&SAMPLE.replace("1h30m", "later"));
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_zero_limit() {
        let file = write_config(&SAMPLE.replace(
            "base_url = \"http://example.org/radio/\"",
            "base_url = \"http://example.org/radio/\"\nlimit = 0",
        ));
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_bad_date_pattern() {
        assert!(validate_date_pattern("%Y-%m-%d").is_ok());
        assert!(validate_date_pattern("%Q").is_err());
    }

    #[test]
    fn expands_env_vars() {
        std::env::set_var("STREAMCAST_TEST_ROOT", "/data");
        assert_eq!(
            expand_path(Path::new("${STREAMCAST_TEST_ROOT}/radio")),
            PathBuf::from("/data/radio")
        );
    }
}
