use anyhow::Result;

use crate::config::Config;

/// Prints the configured stations and shows as two tables.
pub fn list_stations(config: &Config) -> Result<()> {
    println!("{:<16} {:<24} {:<6} STREAM", "STATION", "NAME", "LOGO");
    for key in config.station_ids() {
        let Some(station) = config.station(&key) else {
            continue;
        };
        let logo = if station.logo_url.is_some() { "yes" } else { "no" };
        println!(
            "{:<16} {:<24} {:<6} {}",
            station.key, station.name, logo, station.stream_url
        );
    }

    if config.shows.is_empty() {
        return Ok(());
    }

    println!();
    println!("{:<16} {:<16} {:<10} TITLE", "SHOW", "STATION", "SECONDS");
    for id in config.show_ids() {
        match config.show(&id) {
            Some(show) => println!(
                "{:<16} {:<16} {:<10} {}",
                show.id, show.station.key, show.duration_secs, show.title
            ),
            None => println!("{:<16} {:<16} {:<10} (invalid)", id, "-", "-"),
        }
    }

    Ok(())
}
