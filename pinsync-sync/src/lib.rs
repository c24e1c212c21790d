//! # pinsync-sync
//!
//! Reconciliation of a local content store against a remote pin directory.
//!
//! Build an [`Engine`] from a [`PinDirectory`], a [`PinStore`] and a
//! [`RegistryPublisher`], then drive it with [`Engine::run`].

pub mod engine;
pub mod error;
mod http;
pub mod publisher;
pub mod queue;
pub mod remote;
pub mod store;

pub use engine::{CycleOutcome, Engine, EngineSettings, PriorityOutcome, SyncSummary};
pub use error::{ListError, SyncError};
pub use publisher::{FilePublisher, RegistryPublisher};
pub use queue::PriorityQueue;
pub use remote::{PinDirectory, RemoteDirectoryClient};
pub use store::{LocalStoreClient, PinStore};
