//! Runtime settings and the pairing properties file.
//!
//! Process-level settings (store API, listen port, paths, interval) are fixed
//! for the life of the process. Pairing properties live in a JSON file written
//! by the device's setup flow and are re-read periodically by the daemon.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ConfigError;

pub const DEFAULT_KUBO_API: &str = "http://127.0.0.1:5001";
pub const DEFAULT_LISTEN_PORT: u16 = 3501;
pub const DEFAULT_PROPS_FILE: &str = "/internal/box_props.json";
pub const DEFAULT_REGISTRY_CID_PATH: &str = "/internal/fula-gateway/registry.cid";
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(3 * 60);

const TOKEN_KEY: &str = "auto_pin_token";
const ENDPOINT_KEY: &str = "auto_pin_endpoint";
const SECRET_KEY: &str = "auto_pin_pairing_secret";

// ---------------------------------------------------------------------------
// Pairing properties
// ---------------------------------------------------------------------------

/// Credentials that pair this node with a remote pinning service.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PairingProps {
    /// Bearer token for the remote pinning service.
    pub pinning_token: String,
    /// Base URL of the remote pinning service.
    pub pinning_endpoint: String,
    /// Shared secret guarding the control-plane API.
    pub pairing_secret: String,
}

impl PairingProps {
    /// Read pairing properties from a JSON object file.
    ///
    /// Missing keys and non-string values read as empty strings.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let props: Map<String, Value> =
            serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            pinning_token: string_val(&props, TOKEN_KEY),
            pinning_endpoint: string_val(&props, ENDPOINT_KEY),
            pairing_secret: string_val(&props, SECRET_KEY),
        })
    }

    /// A node is paired once both the token and the endpoint are known.
    pub fn is_paired(&self) -> bool {
        !self.pinning_token.is_empty() && !self.pinning_endpoint.is_empty()
    }
}

impl fmt::Debug for PairingProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingProps")
            .field("pinning_token", &redact(&self.pinning_token))
            .field("pinning_endpoint", &self.pinning_endpoint)
            .field("pairing_secret", &redact(&self.pairing_secret))
            .finish()
    }
}

fn string_val(props: &Map<String, Value>, key: &str) -> String {
    props
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Full daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the local store's HTTP API (without `/api/v0`).
    pub kubo_api: String,
    pub listen_port: u16,
    pub props_file: PathBuf,
    pub sync_interval: Duration,
    /// Destination of the registry pointer file; empty disables publishing.
    pub registry_cid_path: PathBuf,
    pub pairing: PairingProps,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kubo_api: DEFAULT_KUBO_API.to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            props_file: PathBuf::from(DEFAULT_PROPS_FILE),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            registry_cid_path: PathBuf::from(DEFAULT_REGISTRY_CID_PATH),
            pairing: PairingProps::default(),
        }
    }
}

/// What changed after re-reading the properties file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingChange {
    Unchanged,
    Changed { was_paired: bool, now_paired: bool },
}

impl Config {
    pub fn is_paired(&self) -> bool {
        self.pairing.is_paired()
    }

    /// Re-read the properties file into `self.pairing`.
    ///
    /// An unreadable file clears the pairing (the node becomes unpaired); a
    /// file that cannot be parsed leaves the previous pairing in place.
    pub fn reload_pairing(&mut self) -> PairingChange {
        let previous = self.pairing.clone();
        match PairingProps::load(&self.props_file) {
            Ok(props) => self.pairing = props,
            Err(err @ ConfigError::Io { .. }) => {
                tracing::warn!(error = %err, "pairing properties unavailable");
                self.pairing = PairingProps::default();
            }
            Err(err) => {
                tracing::warn!(error = %err, "keeping previous pairing properties");
            }
        }

        if previous == self.pairing {
            PairingChange::Unchanged
        } else {
            PairingChange::Changed {
                was_paired: previous.is_paired(),
                now_paired: self.pairing.is_paired(),
            }
        }
    }

    /// Non-secret view of the configuration for display.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            kubo_api: self.kubo_api.clone(),
            listen_port: self.listen_port,
            props_file: self.props_file.display().to_string(),
            sync_interval: humantime::format_duration(self.sync_interval).to_string(),
            registry_cid_path: self.registry_cid_path.display().to_string(),
            paired: self.is_paired(),
            pinning_endpoint: self.pairing.pinning_endpoint.clone(),
        }
    }
}

/// Serializable, secret-free snapshot of a [`Config`].
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub kubo_api: String,
    pub listen_port: u16,
    pub props_file: String,
    pub sync_interval: String,
    pub registry_cid_path: String,
    pub paired: bool,
    pub pinning_endpoint: String,
}

/// Parse a humantime duration such as `3m` or `90s`.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|source| ConfigError::Duration {
        value: value.to_string(),
        source,
    })
}

/// Parse the sync interval, falling back to [`DEFAULT_SYNC_INTERVAL`] when the
/// value is malformed or zero.
pub fn sync_interval_or_default(value: &str) -> Duration {
    match parse_duration(value) {
        Ok(interval) if !interval.is_zero() => interval,
        Ok(_) => {
            tracing::warn!(value, "zero sync interval, using default");
            DEFAULT_SYNC_INTERVAL
        }
        Err(err) => {
            tracing::warn!(error = %err, "invalid sync interval, using default");
            DEFAULT_SYNC_INTERVAL
        }
    }
}
