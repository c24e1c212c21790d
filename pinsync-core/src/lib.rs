//! pinsync core library: domain types, configuration, errors.
//!
//! - [`types`]: identifiers and wire structs
//! - [`config`]: runtime settings and pairing properties
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ConfigSummary, PairingChange, PairingProps};
pub use error::ConfigError;
pub use types::{
    Cid, DaemonStatus, PinData, PinListResponse, PinnedSet, RemotePinEntry, ReportMissingRequest,
    ReportMissingResponse,
};
