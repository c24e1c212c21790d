//! Blocking client for a running daemon's control plane.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::json;

use pinsync_core::{Config, DaemonStatus, ReportMissingResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const API_PREFIX: &str = "/api/v1/auto-pin";

pub struct ControlPlane {
    base: String,
    secret: String,
    agent: ureq::Agent,
}

impl ControlPlane {
    /// Client for the daemon described by `config`, authenticated with its
    /// pairing secret.
    pub fn for_config(config: &Config, host: &str) -> Result<Self> {
        if config.pairing.pairing_secret.is_empty() {
            bail!(
                "no pairing secret in {}; is this node paired?",
                config.props_file.display()
            );
        }
        Ok(Self {
            base: format!("http://{host}:{}{API_PREFIX}", config.listen_port),
            secret: config.pairing.pairing_secret.clone(),
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        })
    }

    pub fn status(&self) -> Result<DaemonStatus> {
        let url = format!("{}/status", self.base);
        let response = self
            .agent
            .get(&url)
            .set("Authorization", &self.bearer())
            .call()
            .map_err(|err| describe(err, &url))?;
        response
            .into_json()
            .with_context(|| format!("invalid status payload from {url}"))
    }

    pub fn report_missing(&self, cids: &[String]) -> Result<ReportMissingResponse> {
        let url = format!("{}/report-missing", self.base);
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &self.bearer())
            .send_json(json!({ "cids": cids }))
            .map_err(|err| describe(err, &url))?;
        response
            .into_json()
            .with_context(|| format!("invalid report-missing payload from {url}"))
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.secret)
    }
}

fn describe(err: ureq::Error, url: &str) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            anyhow::anyhow!("{url} answered {code}: {}", body.trim())
        }
        ureq::Error::Transport(transport) => {
            anyhow::anyhow!("daemon unreachable at {url}: {transport}")
        }
    }
}
