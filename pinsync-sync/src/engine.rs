//! Reconciliation engine.
//!
//! The engine keeps the local store a superset of the remote pin directory.
//! It owns the in-memory view of locally pinned identifiers and is the only
//! writer of it.
//!
//! ## Lifecycle
//!
//! 1. Await-healthy: probe the local store every `health_retry` until it
//!    answers or the engine is cancelled.
//! 2. Steady-state: run one sync cycle immediately, then react to the sync
//!    interval, the priority queue and cancellation until cancelled.
//!
//! The cache lock is only held for in-memory work; every network call
//! happens with the lock released.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use pinsync_core::{Cid, DaemonStatus, PinnedSet, RemotePinEntry};

use crate::publisher::RegistryPublisher;
use crate::queue::{PriorityQueue, PRIORITY_QUEUE_CAPACITY};
use crate::remote::PinDirectory;
use crate::store::PinStore;

/// Name of the remote entry whose identifier is exported as the registry
/// pointer.
pub const REGISTRY_PIN_NAME: &str = "fula-bucket-registry";

/// Cadence of liveness probes while waiting for the local store.
pub const HEALTH_RETRY_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub sync_interval: Duration,
    pub health_retry: Duration,
    pub queue_capacity: usize,
    pub registry_name: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sync_interval: pinsync_core::config::DEFAULT_SYNC_INTERVAL,
            health_retry: HEALTH_RETRY_INTERVAL,
            queue_capacity: PRIORITY_QUEUE_CAPACITY,
            registry_name: REGISTRY_PIN_NAME.to_string(),
        }
    }
}

/// Counters for one sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub pinned: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Registry identifier observed this cycle, whether or not the write
    /// succeeded.
    pub registry: Option<Cid>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: u128,
}

/// How a sync cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(SyncSummary),
    /// The remote list could not be fetched; nothing was changed.
    RemoteUnavailable,
    /// The local pin set could not be fetched; the cache was left intact.
    LocalUnavailable,
    /// Cancellation was observed between identifiers.
    Cancelled(SyncSummary),
}

/// Result of a single priority pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityOutcome {
    AlreadyPinned,
    Pinned,
    Failed,
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Everything guarded by the engine's reader/writer lock.
#[derive(Debug, Default)]
struct PinCache {
    pins: PinnedSet,
    last_sync_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    directory: Arc<dyn PinDirectory>,
    store: Arc<dyn PinStore>,
    publisher: Arc<dyn RegistryPublisher>,
    settings: EngineSettings,
    cache: RwLock<PinCache>,
    queue: PriorityQueue,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(
        directory: Arc<dyn PinDirectory>,
        store: Arc<dyn PinStore>,
        publisher: Arc<dyn RegistryPublisher>,
        settings: EngineSettings,
    ) -> Self {
        let queue = PriorityQueue::new(settings.queue_capacity);
        Self {
            directory,
            store,
            publisher,
            settings,
            cache: RwLock::new(PinCache::default()),
            queue,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!("starting auto-pin engine");

        if !self.await_healthy(&cancel).await {
            tracing::info!("cancelled while waiting for local store");
            return;
        }

        let mut priority_rx = self.queue.consumer().await;
        self.sync_once(&cancel).await;

        let period = self.settings.sync_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("auto-pin engine shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.sync_once(&cancel).await;
                }
                maybe_cid = priority_rx.recv() => {
                    let Some(cid) = maybe_cid else { break };
                    self.priority_pin(&cid).await;
                }
            }
        }
    }

    /// Probe the local store until it is healthy. Returns `false` if
    /// cancelled first.
    pub async fn await_healthy(&self, cancel: &CancellationToken) -> bool {
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            if self.store.is_healthy().await {
                tracing::info!("local store is healthy");
                return true;
            }
            tracing::info!(
                retry_in = ?self.settings.health_retry,
                "waiting for local store to become healthy"
            );
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(self.settings.health_retry) => {}
            }
        }
    }

    /// Run one full reconciliation pass.
    pub async fn sync_once(&self, cancel: &CancellationToken) -> CycleOutcome {
        tracing::info!("starting sync cycle");
        let started = Instant::now();
        let mut summary = SyncSummary {
            started_at: Some(Utc::now()),
            ..SyncSummary::default()
        };

        let remote = match self.directory.list_all().await {
            Ok(remote) => remote,
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch remote pins");
                return CycleOutcome::RemoteUnavailable;
            }
        };
        tracing::info!(count = remote.len(), "fetched remote pins");

        summary.registry = self.publish_registry(&remote).await;

        let local = match self.store.list_pinned().await {
            Ok(local) => local,
            Err(err) => {
                tracing::error!(error = %err, "failed to fetch local pins");
                return CycleOutcome::LocalUnavailable;
            }
        };
        self.cache.write().await.pins = local;

        let mut attempted: HashSet<&Cid> = HashSet::new();
        for entry in &remote {
            if cancel.is_cancelled() {
                tracing::info!("sync cycle cancelled");
                summary.duration_ms = started.elapsed().as_millis();
                return CycleOutcome::Cancelled(summary);
            }

            let cid = entry.cid();
            // The registry entry is only exported to the pointer file; the
            // local node does not pin it, so the gateway cannot fetch it here.
            if cid.is_empty() || self.is_registry(entry) || !attempted.insert(cid) {
                continue;
            }

            if self.is_pinned(cid).await {
                summary.skipped += 1;
                continue;
            }

            match self.store.add_pin(cid).await {
                Ok(()) => {
                    self.cache.write().await.pins.insert(cid.clone());
                    summary.pinned += 1;
                }
                Err(err) => {
                    tracing::warn!(cid = %cid, error = %err, "failed to pin");
                    summary.failed += 1;
                }
            }
        }

        self.cache.write().await.last_sync_at = Some(Utc::now());
        summary.duration_ms = started.elapsed().as_millis();
        tracing::info!(
            pinned = summary.pinned,
            skipped = summary.skipped,
            failed = summary.failed,
            duration_ms = summary.duration_ms,
            "sync complete",
        );
        CycleOutcome::Completed(summary)
    }

    /// Pin one identifier ahead of the next cycle.
    ///
    /// Failures are logged and dropped; the next full cycle retries any
    /// identifier the remote directory still lists.
    pub async fn priority_pin(&self, cid: &Cid) -> PriorityOutcome {
        if self.is_pinned(cid).await {
            return PriorityOutcome::AlreadyPinned;
        }

        tracing::info!(cid = %cid, "priority pinning");
        match self.store.add_pin(cid).await {
            Ok(()) => {
                self.cache.write().await.pins.insert(cid.clone());
                PriorityOutcome::Pinned
            }
            Err(err) => {
                tracing::warn!(cid = %cid, error = %err, "failed to priority pin");
                PriorityOutcome::Failed
            }
        }
    }

    /// Queue identifiers for a priority pin without waiting. Returns how many
    /// were accepted.
    pub fn queue_priority<I>(&self, cids: I) -> usize
    where
        I: IntoIterator<Item = Cid>,
    {
        let mut accepted = 0;
        for cid in cids {
            if self.queue.try_push(cid) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Point-in-time status snapshot.
    pub async fn status(&self) -> DaemonStatus {
        let cache = self.cache.read().await;
        let last_sync_at = cache.last_sync_at;
        DaemonStatus {
            paired: true,
            total_pinned: cache.pins.len(),
            total_pending: self.queue.depth(),
            last_sync_at,
            next_sync_at: last_sync_at.and_then(|at| {
                chrono::Duration::from_std(self.settings.sync_interval)
                    .ok()
                    .map(|interval| at + interval)
            }),
        }
    }

    pub async fn is_pinned(&self, cid: &Cid) -> bool {
        self.cache.read().await.pins.contains(cid)
    }

    /// Copy of the cached pin set.
    pub async fn pinned_snapshot(&self) -> PinnedSet {
        self.cache.read().await.pins.clone()
    }

    fn is_registry(&self, entry: &RemotePinEntry) -> bool {
        entry.name() == self.settings.registry_name
    }

    async fn publish_registry(&self, remote: &[RemotePinEntry]) -> Option<Cid> {
        let cid = remote
            .iter()
            .find(|entry| self.is_registry(entry) && !entry.cid().is_empty())?
            .cid()
            .clone();

        let publisher = Arc::clone(&self.publisher);
        let to_publish = cid.clone();
        let result = tokio::task::spawn_blocking(move || publisher.publish(&to_publish)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(cid = %cid, error = %err, "failed to write registry CID"),
            Err(err) => tracing::error!(cid = %cid, error = %err, "registry publish task failed"),
        }
        Some(cid)
    }
}
