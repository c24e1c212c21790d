//! Error types for pinsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration and pairing properties.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The properties file could not be read (missing, permission denied, ...).
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The properties file is not a JSON object.
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A duration setting could not be parsed.
    #[error("invalid duration '{value}': {source}")]
    Duration {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
}
