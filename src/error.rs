//! Error kinds raised by the capture and feed pipelines.
//!
//! Only some of these abort the enclosing operation. `TagWrite`, `LogoFetch`
//! and `UnreadableAudioHeader` are logged and absorbed by their callers; the
//! others propagate to the command layer, which reports them and exits
//! non-zero.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Connecting to, or reading from, the stream failed before the
    /// requested duration elapsed.
    #[error("stream {url} unavailable: {reason}")]
    StreamUnavailable { url: String, reason: String },

    /// ID3 tags could not be written to a captured file.
    #[error("failed to write tags to {}: {reason}", path.display())]
    TagWrite { path: PathBuf, reason: String },

    /// The cover image could not be fetched.
    #[error("failed to fetch logo {url}: {reason}")]
    LogoFetch { url: String, reason: String },

    /// The file has no readable MPEG header or tag block.
    #[error("couldn't find MPEG header in file {}: {reason}", path.display())]
    UnreadableAudioHeader { path: PathBuf, reason: String },

    /// A scanned file could not be turned into a feed item.
    #[error("{file}: {reason}")]
    FeedItemBuild { file: String, reason: String },

    /// Operator supplied a value that cannot be used.
    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to serialize feed: {0}")]
    Xml(String),
}

impl Error {
    pub fn stream(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::StreamUnavailable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
