//! pinsync: keeps a local Kubo node pinned to everything a remote pinning
//! service lists.
//!
//! # Usage
//!
//! ```text
//! pinsync daemon                       run the reconciliation daemon in the foreground
//! pinsync status [--json]              query a running daemon's control plane
//! pinsync report-missing <CID>...      ask a running daemon to pin identifiers now
//! pinsync config                       print the effective configuration (no secrets)
//! ```
//!
//! Every subcommand reads the same settings from flags or environment:
//! `KUBO_API`, `AUTO_PIN_PORT`, `PROPS_FILE`, `SYNC_INTERVAL`,
//! `REGISTRY_CID_PATH`.

mod commands;
mod control;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use commands::{config::ConfigCmd, report::ReportArgs, status::StatusArgs};
use pinsync_core::config::{
    sync_interval_or_default, DEFAULT_KUBO_API, DEFAULT_LISTEN_PORT, DEFAULT_PROPS_FILE,
    DEFAULT_REGISTRY_CID_PATH,
};
use pinsync_core::Config;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pinsync",
    version,
    about = "Reconcile a local Kubo node against a remote pinning service",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the daemon in the foreground until SIGINT/SIGTERM.
    Daemon(ConfigArgs),

    /// Show a running daemon's sync status.
    Status(StatusArgs),

    /// Report identifiers a client could not fetch so they are pinned first.
    ReportMissing(ReportArgs),

    /// Print the effective configuration.
    Config(ConfigCmd),
}

// ---------------------------------------------------------------------------
// Shared configuration arguments
// ---------------------------------------------------------------------------

/// Settings shared by every subcommand; each falls back to its environment
/// variable, then to the built-in default.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Base URL of the local Kubo API.
    #[arg(long, env = "KUBO_API", default_value = DEFAULT_KUBO_API)]
    pub kubo_api: String,

    /// Control-plane listen port.
    #[arg(long, env = "AUTO_PIN_PORT", default_value_t = DEFAULT_LISTEN_PORT)]
    pub port: u16,

    /// JSON properties file holding the pairing credentials.
    #[arg(long, env = "PROPS_FILE", default_value = DEFAULT_PROPS_FILE)]
    pub props_file: PathBuf,

    /// Time between full sync cycles, e.g. `3m` or `90s`.
    #[arg(long, env = "SYNC_INTERVAL", default_value = "3m")]
    pub sync_interval: String,

    /// Where the registry identifier is published; empty disables it.
    #[arg(long, env = "REGISTRY_CID_PATH", default_value = DEFAULT_REGISTRY_CID_PATH)]
    pub registry_cid_path: PathBuf,
}

impl ConfigArgs {
    /// Resolve into a [`Config`], reading pairing properties from disk.
    pub fn resolve(self) -> Config {
        let mut config = Config {
            kubo_api: self.kubo_api,
            listen_port: self.port,
            props_file: self.props_file,
            sync_interval: sync_interval_or_default(&self.sync_interval),
            registry_cid_path: self.registry_cid_path,
            pairing: Default::default(),
        };
        config.reload_pairing();
        config
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Daemon(args) => commands::daemon::run(args),
        Commands::Status(args) => args.run(),
        Commands::ReportMissing(args) => args.run(),
        Commands::Config(args) => args.run(),
    }
}
