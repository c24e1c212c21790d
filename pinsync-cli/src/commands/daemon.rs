//! `pinsync daemon`: foreground supervisor.

use anyhow::{Context, Result};

use crate::ConfigArgs;

pub fn run(args: ConfigArgs) -> Result<()> {
    let config = args.resolve();
    pinsync_daemon::start_blocking(config).context("daemon exited with error")
}
