//! Pin reconciliation daemon: supervisor + control-plane server.

mod error;
mod runtime;
pub mod server;

pub use error::DaemonError;
pub use runtime::{build_engine, run, start_blocking, supervise, CONFIG_POLL_INTERVAL};
pub use server::{router, MAX_BODY_BYTES, MAX_REPORTED_CIDS};
