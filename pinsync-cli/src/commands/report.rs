//! `pinsync report-missing`: push identifiers onto the daemon's priority queue.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use pinsync_core::Cid;

use crate::control::ControlPlane;
use crate::ConfigArgs;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Identifiers to pin ahead of the next sync cycle.
    #[arg(required = true, value_name = "CID")]
    pub cids: Vec<String>,

    /// Host the control plane listens on.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, Serialize)]
struct ReportOutcome {
    submitted: usize,
    malformed: Vec<String>,
    queued: usize,
}

impl ReportArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.resolve();
        let client = ControlPlane::for_config(&config, &self.host)?;

        let malformed: Vec<String> = self
            .cids
            .iter()
            .filter(|cid| !Cid::is_well_formed(cid))
            .cloned()
            .collect();
        let response = client
            .report_missing(&self.cids)
            .context("failed to report missing identifiers")?;

        let outcome = ReportOutcome {
            submitted: self.cids.len(),
            malformed,
            queued: response.queued,
        };
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("failed to render report JSON")?
            );
            return Ok(());
        }

        for cid in &outcome.malformed {
            println!("{} {cid}: not a valid identifier", "skipped".yellow());
        }
        println!(
            "queued {} of {} identifiers",
            outcome.queued.to_string().green().bold(),
            outcome.submitted
        );
        Ok(())
    }
}
