//! Error types for pinsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use pinsync_core::RemotePinEntry;

/// All errors that can arise from talking to the remote directory, the local
/// store, or the registry pointer file.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The configured base URL cannot be turned into a request URL.
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Network, DNS or timeout failure before a response arrived.
    #[error("{operation}: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The peer answered with a non-success status.
    #[error("{operation}: status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    /// The peer answered with a body we could not decode.
    #[error("{operation} decode: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    /// The peer answered with a well-formed but unusable payload.
    #[error("{operation}: {reason}")]
    Protocol { operation: String, reason: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a paginated listing, carrying every entry fetched before the
/// failing page.
#[derive(Debug, Error)]
#[error("{source} ({} entries fetched before failure)", .partial.len())]
pub struct ListError {
    pub partial: Vec<RemotePinEntry>,
    #[source]
    pub source: SyncError,
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
