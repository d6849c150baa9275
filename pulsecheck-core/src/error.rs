//! Error types for pulsecheck-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the pulsecheck-core library
#[derive(Error, Debug)]
pub enum Error {
    /// The top-level transcript directory could not be read
    #[error("cannot read transcript directory {}: {source}", path.display())]
    TranscriptDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Structured report rendering error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for pulsecheck-core
pub type Result<T> = std::result::Result<T, Error>;
