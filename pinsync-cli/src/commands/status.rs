//! `pinsync status`: sync progress of a running daemon.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use pinsync_core::DaemonStatus;

use crate::control::ControlPlane;
use crate::ConfigArgs;

/// Arguments for `pinsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Host the control plane listens on.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.resolve();
        let client = ControlPlane::for_config(&config, &self.host)?;
        let status = client.status().context("failed to query daemon status")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(&status, Utc::now());
        Ok(())
    }
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

fn print_table(status: &DaemonStatus, now: DateTime<Utc>) {
    let paired = if status.paired {
        "yes".green().bold().to_string()
    } else {
        "no".red().bold().to_string()
    };
    let rows = vec![
        StatusRow {
            field: "paired",
            value: paired,
        },
        StatusRow {
            field: "pinned",
            value: status.total_pinned.to_string(),
        },
        StatusRow {
            field: "pending",
            value: status.total_pending.to_string(),
        },
        StatusRow {
            field: "last sync",
            value: describe_time(status.last_sync_at, now),
        },
        StatusRow {
            field: "next sync",
            value: describe_time(status.next_sync_at, now),
        },
    ];

    println!("pinsync v{}", env!("CARGO_PKG_VERSION"));
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn describe_time(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return "never".bright_black().to_string();
    };
    format!("{} ({})", at.format("%Y-%m-%d %H:%M:%S UTC"), relative(at, now))
}

/// Coarse human distance between `at` and `now`, e.g. `2m ago`, `in 40s`.
fn relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(at);
    let (secs, future) = if delta.num_seconds() < 0 {
        (-delta.num_seconds(), true)
    } else {
        (delta.num_seconds(), false)
    };

    let amount = match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86_399 => format!("{}h", secs / 3600),
        _ => format!("{}d", secs / 86_400),
    };
    if future {
        format!("in {amount}")
    } else {
        format!("{amount} ago")
    }
}
