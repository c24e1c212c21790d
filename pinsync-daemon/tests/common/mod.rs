//! In-memory engine collaborators for control-plane tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pinsync_core::{Cid, PinData, PinnedSet, RemotePinEntry};
use pinsync_sync::{
    Engine, EngineSettings, ListError, PinDirectory, PinStore, RegistryPublisher, SyncError,
};

pub const SECRET: &str = "pairing-secret";

pub struct StaticDirectory(pub Vec<RemotePinEntry>);

#[async_trait]
impl PinDirectory for StaticDirectory {
    async fn list_all(&self) -> Result<Vec<RemotePinEntry>, ListError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub pins: Mutex<PinnedSet>,
}

#[async_trait]
impl PinStore for MemoryStore {
    async fn add_pin(&self, cid: &Cid) -> Result<(), SyncError> {
        self.pins.lock().expect("pins").insert(cid.clone());
        Ok(())
    }

    async fn list_pinned(&self) -> Result<PinnedSet, SyncError> {
        Ok(self.pins.lock().expect("pins").clone())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}

pub struct NullPublisher;

impl RegistryPublisher for NullPublisher {
    fn publish(&self, _cid: &Cid) -> Result<(), SyncError> {
        Ok(())
    }
}

pub fn entry(cid: &str) -> RemotePinEntry {
    RemotePinEntry {
        requestid: format!("req-{cid}"),
        status: "pinned".to_string(),
        pin: PinData {
            cid: Cid::from(cid),
            name: String::new(),
        },
        created: String::new(),
    }
}

/// Engine over in-memory collaborators with a queue of `queue_capacity`.
pub fn engine(remote: Vec<RemotePinEntry>, queue_capacity: usize) -> Arc<Engine> {
    Arc::new(Engine::new(
        Arc::new(StaticDirectory(remote)),
        Arc::new(MemoryStore::default()),
        Arc::new(NullPublisher),
        EngineSettings {
            queue_capacity,
            ..EngineSettings::default()
        },
    ))
}

/// `n` distinct well-formed identifiers.
pub fn valid_cids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("bafyreport{i:08}")).collect()
}
