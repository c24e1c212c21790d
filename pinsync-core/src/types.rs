//! Domain types shared by the sync engine, its clients and the control plane.
//!
//! Wire structs mirror the JSON shapes of the remote pinning service and of
//! the control-plane API; they are serializable via serde + serde_json.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Shortest identifier accepted from outside callers.
pub const CID_MIN_LEN: usize = 10;

/// Longest identifier accepted from outside callers.
pub const CID_MAX_LEN: usize = 200;

/// Prefixes of the identifier families accepted from outside callers:
/// base32 CIDv1 (`baf...`) and base58 CIDv0 (`Qm...`).
pub const CID_PREFIXES: [&str; 2] = ["baf", "Qm"];

/// An opaque content identifier.
///
/// Compared by exact string equality; no normalisation is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(pub String);

impl Cid {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Syntactic check for identifiers reported by outside callers.
    ///
    /// Only length and family prefix are inspected; the multihash itself is
    /// never decoded.
    pub fn is_well_formed(candidate: &str) -> bool {
        (CID_MIN_LEN..=CID_MAX_LEN).contains(&candidate.len())
            && CID_PREFIXES
                .iter()
                .any(|prefix| candidate.starts_with(prefix))
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Cid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Cid {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifiers currently pinned recursively on the local store.
///
/// Presence means "pinned"; absence means "unknown or not pinned".
pub type PinnedSet = HashSet<Cid>;

// ---------------------------------------------------------------------------
// Remote pin directory wire types
// ---------------------------------------------------------------------------

/// The `pin` object nested inside a remote pin record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PinData {
    #[serde(default)]
    pub cid: Cid,
    #[serde(default)]
    pub name: String,
}

/// One record from the remote pin directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemotePinEntry {
    #[serde(default)]
    pub requestid: String,
    #[serde(default)]
    pub status: String,
    pub pin: PinData,
    /// Creation timestamp as sent by the service; used verbatim as the
    /// pagination cursor, never parsed.
    #[serde(default)]
    pub created: String,
}

impl RemotePinEntry {
    pub fn cid(&self) -> &Cid {
        &self.pin.cid
    }

    pub fn name(&self) -> &str {
        &self.pin.name
    }
}

/// One page of `GET /pins`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PinListResponse {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub results: Vec<RemotePinEntry>,
}

// ---------------------------------------------------------------------------
// Control-plane wire types
// ---------------------------------------------------------------------------

/// Point-in-time engine status as served by `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub paired: bool,
    pub total_pinned: usize,
    pub total_pending: usize,
    /// `None` until the first sync cycle completes.
    pub last_sync_at: Option<DateTime<Utc>>,
    pub next_sync_at: Option<DateTime<Utc>>,
}

/// Body of `POST /report-missing`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportMissingRequest {
    #[serde(default)]
    pub cids: Vec<String>,
}

/// Response of `POST /report-missing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMissingResponse {
    pub queued: usize,
}
