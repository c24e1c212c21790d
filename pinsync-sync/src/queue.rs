//! Bounded, drop-on-full queue of identifiers awaiting an out-of-cycle pin.

use tokio::sync::{mpsc, Mutex, MutexGuard};

use pinsync_core::Cid;

/// Default number of identifiers the queue can hold.
pub const PRIORITY_QUEUE_CAPACITY: usize = 100;

/// Best-effort signalling channel: producers never block and identifiers
/// that do not fit are dropped. The full sync cycle is the durable fallback.
#[derive(Debug)]
pub struct PriorityQueue {
    tx: mpsc::Sender<Cid>,
    rx: Mutex<mpsc::Receiver<Cid>>,
}

impl PriorityQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Push without waiting. Returns `false` when the queue is full.
    pub fn try_push(&self, cid: Cid) -> bool {
        match self.tx.try_send(cid) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(cid)) => {
                tracing::warn!(cid = %cid, "priority queue full, dropping");
                false
            }
            Err(mpsc::error::TrySendError::Closed(cid)) => {
                tracing::warn!(cid = %cid, "priority queue closed, dropping");
                false
            }
        }
    }

    /// Number of identifiers waiting to be consumed.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Exclusive access to the consuming end. Holding the guard makes the
    /// caller the single consumer.
    pub async fn consumer(&self) -> MutexGuard<'_, mpsc::Receiver<Cid>> {
        self.rx.lock().await
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new(PRIORITY_QUEUE_CAPACITY)
    }
}
