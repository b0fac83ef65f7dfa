//! Error types for logwarden

use std::path::PathBuf;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the handle lifecycle subsystem
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or contradictory logger options
    #[error("invalid logger configuration: {0}")]
    Configuration(String),

    /// A preset name that is not registered
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    /// Operation on a logger name that was never registered
    #[error("no logger registered under '{0}'")]
    NotFound(String),

    /// Writing to, rotating, or deleting a log file failed
    #[error("log file operation failed for {}: {source}", path.display())]
    SinkIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An event subscriber returned an error or panicked
    #[error("subscriber for '{event}' failed: {message}")]
    Subscriber { event: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an I/O error with the path it concerns
    pub fn sink_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::SinkIo {
            path: path.into(),
            source,
        }
    }
}
