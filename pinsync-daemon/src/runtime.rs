//! Daemon supervisor.
//!
//! Owns the process lifecycle: while the node is paired, an engine and its
//! control-plane server run together as one session. The properties file is
//! re-read on a fixed cadence and any pairing change tears the session down
//! and starts a fresh one from the new properties.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use pinsync_core::{Config, PairingChange};
use pinsync_sync::{
    Engine, EngineSettings, FilePublisher, LocalStoreClient, RemoteDirectoryClient,
};

use crate::error::{io_err, DaemonError};
use crate::server;

/// How often the properties file is re-read.
pub const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Build a runtime, install tracing, and block until shutdown.
pub fn start_blocking(config: Config) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Run the supervisor until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<(), DaemonError> {
    tracing::info!(
        kubo_api = %config.kubo_api,
        port = config.listen_port,
        sync_interval = ?config.sync_interval,
        "starting pinsync daemon",
    );

    let shutdown = CancellationToken::new();
    let signal_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = wait_for_signal().await;
            shutdown.cancel();
            result
        })
    };

    supervise(config, CONFIG_POLL_INTERVAL, shutdown).await;

    // The signal task only finishes on its own when a signal arrived.
    signal_handle.abort();
    match signal_handle.await {
        Err(err) if err.is_cancelled() => Ok(()),
        other => handle_join("signal", other),
    }
}

/// Keep a session running for as long as the node is paired, restarting it
/// whenever the pairing properties change. Returns once `shutdown` fires.
///
/// Nothing here ends the supervisor early: session failures are logged, and a
/// control plane that could not bind is retried on every poll tick.
pub async fn supervise(mut config: Config, poll_interval: Duration, shutdown: CancellationToken) {
    let mut session = Session::start_if_paired(&config, &shutdown).await;

    let mut poll = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = poll.tick() => match config.reload_pairing() {
                PairingChange::Unchanged => {
                    if let Some(session) = session.as_mut() {
                        session.ensure_serving().await;
                    }
                }
                PairingChange::Changed { was_paired, now_paired } => {
                    tracing::info!(was_paired, now_paired, "pairing properties changed");
                    if let Some(previous) = session.take() {
                        previous.stop().await;
                    }
                    session = Session::start_if_paired(&config, &shutdown).await;
                }
            },
        }
    }

    tracing::info!("shutting down pinsync daemon");
    if let Some(session) = session {
        session.stop().await;
    }
}

/// Assemble an engine wired to real clients from `config`.
pub fn build_engine(config: &Config) -> Result<Engine, DaemonError> {
    let directory = RemoteDirectoryClient::new(
        &config.pairing.pinning_endpoint,
        config.pairing.pinning_token.clone(),
    )?;
    let store = LocalStoreClient::new(&config.kubo_api)?;
    let publisher = FilePublisher::new(&config.registry_cid_path);
    let settings = EngineSettings {
        sync_interval: config.sync_interval,
        ..EngineSettings::default()
    };
    Ok(Engine::new(
        Arc::new(directory),
        Arc::new(store),
        Arc::new(publisher),
        settings,
    ))
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

type TaskHandle = JoinHandle<Result<(), DaemonError>>;

/// An engine and its control-plane server, cancelled together.
struct Session {
    cancel: CancellationToken,
    engine: Arc<Engine>,
    addr: SocketAddr,
    secret: String,
    engine_task: TaskHandle,
    /// `None` while the control-plane port could not be bound.
    server_task: Option<TaskHandle>,
}

impl Session {
    /// Start a session, or return `None` when the node is unpaired or the
    /// pairing properties cannot produce working clients.
    async fn start_if_paired(config: &Config, shutdown: &CancellationToken) -> Option<Self> {
        if !config.is_paired() {
            tracing::info!("not paired, waiting for pairing properties");
            return None;
        }

        let engine = match build_engine(config) {
            Ok(engine) => Arc::new(engine),
            Err(err) => {
                tracing::error!(error = %err, "cannot start engine from pairing properties");
                return None;
            }
        };

        let cancel = shutdown.child_token();
        let engine_task = {
            let engine = engine.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                engine.run(cancel).await;
                Ok::<(), DaemonError>(())
            })
        };

        let mut session = Self {
            cancel,
            engine,
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.listen_port)),
            secret: config.pairing.pairing_secret.clone(),
            engine_task,
            server_task: None,
        };
        session.ensure_serving().await;
        Some(session)
    }

    /// Bind and serve the control plane unless it is already running. A
    /// server that exited is reaped and restarted.
    async fn ensure_serving(&mut self) {
        if let Some(task) = self.server_task.take() {
            if !task.is_finished() {
                self.server_task = Some(task);
                return;
            }
            if let Err(err) = handle_join("control_plane", task.await) {
                tracing::error!(error = %err, "control plane stopped");
            }
        }

        let listener = match TcpListener::bind(self.addr).await {
            Ok(listener) => listener,
            Err(source) => {
                let err = DaemonError::Bind {
                    addr: self.addr,
                    source,
                };
                tracing::error!(error = %err, "control plane unavailable, retrying on next poll");
                return;
            }
        };
        tracing::info!(
            addr = %listener.local_addr().unwrap_or(self.addr),
            "paired, control plane listening",
        );

        let app = server::router(self.engine.clone(), self.secret.clone());
        let cancel = self.cancel.clone();
        self.server_task = Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
                .map_err(|e| io_err("control-plane", e))
        }));
    }

    async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = handle_join("engine", self.engine_task.await) {
            tracing::error!(error = %err, "engine did not stop cleanly");
        }
        if let Some(task) = self.server_task {
            if let Err(err) = handle_join("control_plane", task.await) {
                tracing::error!(error = %err, "control plane did not stop cleanly");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
async fn wait_for_signal() -> Result<(), DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())
        .map_err(|e| DaemonError::Protocol(format!("SIGTERM handler failed: {e}")))?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.map_err(|e| DaemonError::Protocol(format!("ctrl-c handler failed: {e}")))?;
            tracing::info!("received ctrl-c");
        }
        _ = terminate.recv() => tracing::info!("received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<(), DaemonError> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| DaemonError::Protocol(format!("ctrl-c handler failed: {e}")))?;
    tracing::info!("received ctrl-c");
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    if json {
        let _ = fmt().json().with_env_filter(filter).with_target(false).try_init();
    } else {
        let _ = fmt().with_env_filter(filter).with_target(false).try_init();
    }
}
