//! Recording length parsing.
//!
//! Accepts `1h30m`, `45m`, `2h`, `1h5m30s`, `90s` and bare seconds (`90`).
//! Components must appear in hour, minute, second order and each at most
//! once. Anything else, including the empty string, is rejected.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?P<h>\d+)h)?(?:(?P<m>\d+)m)?(?:(?P<s>\d+)s?)?$")
        .expect("duration pattern is valid")
});

/// Parses a recording length into whole seconds.
pub fn parse_duration(input: &str) -> Result<u64> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::invalid("duration must not be empty"));
    }

    let caps = DURATION_RE
        .captures(s)
        .ok_or_else(|| Error::invalid(format!("'{}' is not a valid duration", input)))?;

    let mut total: u64 = 0;
    let mut matched = false;
    for (name, factor) in [("h", 3600u64), ("m", 60), ("s", 1)] {
        if let Some(m) = caps.name(name) {
            let value: u64 = m
                .as_str()
                .parse()
                .map_err(|_| Error::invalid(format!("'{}' is out of range", input)))?;
            total = value
                .checked_mul(factor)
                .and_then(|v| total.checked_add(v))
                .ok_or_else(|| Error::invalid(format!("'{}' is out of range", input)))?;
            matched = true;
        }
    }

    if !matched {
        return Err(Error::invalid(format!("'{}' is not a valid duration", input)));
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_seconds() {
        assert_eq!(parse_duration("90").unwrap(), 90);
        assert_eq!(parse_duration("90s").unwrap(), 90);
        assert_eq!(parse_duration(" 0 ").unwrap(), 0);
    }

    #[test]
    fn hours_and_minutes() {
        assert_eq!(parse_duration("1h30m").unwrap(), 5400);
        assert_eq!(parse_duration("45m").unwrap(), 2700);
        assert_eq!(parse_duration("2h").unwrap(), 7200);
        assert_eq!(parse_duration("1h5m30s").unwrap(), 3930);
        assert_eq!(parse_duration("1H2M").unwrap(), 3720);
    }

    #[test]
    fn trailing_seconds_without_unit() {
        assert_eq!(parse_duration("1m30").unwrap(), 90);
    }

    #[test]
    fn rejects_empty() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("   ").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("30m1h").is_err());
        assert!(parse_duration("1h 30m").is_err());
        assert!(parse_duration("-5").is_err());
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_duration("99999999999999999999h").is_err());
    }
}
