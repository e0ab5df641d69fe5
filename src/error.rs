//! Error taxonomy for configuration, argument and engine failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigctlError {
    /// A configuration document could not be read from disk.
    #[error("failed reading config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration document is not valid YAML or has the wrong shape.
    #[error("invalid config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("section '{section}' in config is undefined in config part '{part}'")]
    UndefinedSection { section: String, part: String },

    /// First required key missing from the resolved section.
    #[error("please set '{key}' parameter in DB config")]
    Validation { key: &'static str },

    #[error("unknown driver '{0}'")]
    UnsupportedDriver(String),

    /// Malformed command-line argument, reported before any engine contact.
    #[error("{0}")]
    Usage(String),

    /// The engine could not be reached or rejected a synchronous request.
    #[error("{0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, MigctlError>;

impl MigctlError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine(message.into())
    }
}
