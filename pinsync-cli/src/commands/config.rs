//! `pinsync config`: effective settings without secrets.

use anyhow::{Context, Result};
use clap::Args;

use crate::ConfigArgs;

#[derive(Args, Debug)]
pub struct ConfigCmd {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl ConfigCmd {
    pub fn run(self) -> Result<()> {
        let summary = self.config.resolve().summary();
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to render config JSON")?
        );
        Ok(())
    }
}
