//! In-memory collaborators and a loopback HTTP helper shared by the
//! integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio_util::sync::CancellationToken;

use pinsync_core::{Cid, PinData, PinnedSet, RemotePinEntry};
use pinsync_sync::{ListError, PinDirectory, PinStore, RegistryPublisher, SyncError};

pub fn cid(s: &str) -> Cid {
    Cid::from(s)
}

pub fn entry(cid: &str, name: &str, created: &str) -> RemotePinEntry {
    RemotePinEntry {
        requestid: format!("req-{cid}"),
        status: "pinned".to_string(),
        pin: PinData {
            cid: Cid::from(cid),
            name: name.to_string(),
        },
        created: created.to_string(),
    }
}

/// Serve `router` on an ephemeral loopback port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Remote directory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeDirectory {
    pub entries: Mutex<Vec<RemotePinEntry>>,
    /// Number of upcoming `list_all` calls that fail.
    pub fail_next: AtomicUsize,
    pub calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn with_entries(entries: Vec<RemotePinEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Self::default()
        }
    }

    pub fn push(&self, entry: RemotePinEntry) {
        self.entries.lock().expect("entries lock").push(entry);
    }

    pub fn fail_times(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl PinDirectory for FakeDirectory {
    async fn list_all(&self) -> Result<Vec<RemotePinEntry>, ListError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ListError {
                partial: Vec::new(),
                source: SyncError::Status {
                    operation: "pinning list".to_string(),
                    status: 503,
                    body: "unavailable".to_string(),
                },
            });
        }
        Ok(self.entries.lock().expect("entries lock").clone())
    }
}

// ---------------------------------------------------------------------------
// Local store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStore {
    pub pins: Mutex<PinnedSet>,
    pub add_calls: Mutex<Vec<Cid>>,
    pub list_calls: AtomicUsize,
    pub failing: Mutex<HashSet<Cid>>,
    pub fail_list: AtomicBool,
    /// Probes answered unhealthy before the store reports healthy.
    pub unhealthy_probes: AtomicUsize,
    pub probes: AtomicUsize,
    /// Time each `add_pin` takes before answering.
    pub pin_delay: Mutex<Option<Duration>>,
    /// Token cancelled from inside the next `add_pin`.
    pub cancel_on_add: Mutex<Option<CancellationToken>>,
}

impl FakeStore {
    pub fn with_pins<'a>(pins: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            pins: Mutex::new(pins.into_iter().map(Cid::from).collect()),
            ..Self::default()
        }
    }

    pub fn fail_pin(&self, cid: &str) {
        self.failing.lock().expect("failing lock").insert(Cid::from(cid));
    }

    pub fn heal_pin(&self, cid: &str) {
        self.failing.lock().expect("failing lock").remove(&Cid::from(cid));
    }

    pub fn slow_pins(&self, delay: Duration) {
        *self.pin_delay.lock().expect("delay lock") = Some(delay);
    }

    pub fn cancel_during_add(&self, token: CancellationToken) {
        *self.cancel_on_add.lock().expect("cancel lock") = Some(token);
    }

    pub fn add_calls(&self) -> Vec<Cid> {
        self.add_calls.lock().expect("calls lock").clone()
    }

    pub fn pinned(&self) -> PinnedSet {
        self.pins.lock().expect("pins lock").clone()
    }
}

#[async_trait]
impl PinStore for FakeStore {
    async fn add_pin(&self, cid: &Cid) -> Result<(), SyncError> {
        self.add_calls.lock().expect("calls lock").push(cid.clone());
        if let Some(token) = self.cancel_on_add.lock().expect("cancel lock").take() {
            token.cancel();
        }
        let delay = *self.pin_delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().expect("failing lock").contains(cid) {
            return Err(SyncError::Status {
                operation: format!("kubo pin/add {cid}"),
                status: 500,
                body: "pin failed".to_string(),
            });
        }
        self.pins.lock().expect("pins lock").insert(cid.clone());
        Ok(())
    }

    async fn list_pinned(&self) -> Result<PinnedSet, SyncError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(SyncError::Protocol {
                operation: "kubo pin/ls".to_string(),
                reason: "store offline".to_string(),
            });
        }
        Ok(self.pinned())
    }

    async fn is_healthy(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.unhealthy_probes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryPublisher {
    pub published: Mutex<Vec<Cid>>,
}

impl MemoryPublisher {
    pub fn published(&self) -> Vec<Cid> {
        self.published.lock().expect("published lock").clone()
    }
}

impl RegistryPublisher for MemoryPublisher {
    fn publish(&self, cid: &Cid) -> Result<(), SyncError> {
        self.published.lock().expect("published lock").push(cid.clone());
        Ok(())
    }
}
