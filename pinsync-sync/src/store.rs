//! Client for the local content store's HTTP API (Kubo `/api/v0`).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::IgnoredAny;
use serde::Deserialize;

use pinsync_core::{Cid, PinnedSet};

use crate::error::SyncError;
use crate::http::{decode, success_body, transport};

/// Per-request timeout for the local store. Recursive pins of large DAGs
/// routinely take minutes.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(120);

/// The local node whose pin set is being reconciled.
#[async_trait]
pub trait PinStore: Send + Sync {
    /// Pin `cid` recursively.
    async fn add_pin(&self, cid: &Cid) -> Result<(), SyncError>;

    /// Every identifier currently pinned recursively.
    async fn list_pinned(&self) -> Result<PinnedSet, SyncError>;

    /// Liveness probe. Unreachable and unhealthy both read as `false`.
    async fn is_healthy(&self) -> bool;
}

#[derive(Debug, Deserialize)]
struct PinLsResponse {
    #[serde(rename = "Keys", default)]
    keys: HashMap<String, IgnoredAny>,
}

/// HTTP client for a Kubo node.
#[derive(Debug, Clone)]
pub struct LocalStoreClient {
    api_url: Url,
    http: reqwest::Client,
}

impl LocalStoreClient {
    /// `api_base` is the node's API origin, e.g. `http://127.0.0.1:5001`.
    pub fn new(api_base: &str) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(STORE_TIMEOUT)
            .build()
            .map_err(transport("build store client"))?;
        Self::with_http(api_base, http)
    }

    pub fn with_http(api_base: &str, http: reqwest::Client) -> Result<Self, SyncError> {
        let api_url = Url::parse(&format!("{}/api/v0/", api_base.trim_end_matches('/'))).map_err(
            |err| SyncError::InvalidEndpoint {
                endpoint: api_base.to_string(),
                reason: err.to_string(),
            },
        )?;
        Ok(Self { api_url, http })
    }

    fn url(&self, command: &str) -> Result<Url, SyncError> {
        self.api_url
            .join(command)
            .map_err(|err| SyncError::InvalidEndpoint {
                endpoint: self.api_url.to_string(),
                reason: err.to_string(),
            })
    }

    async fn post(
        &self,
        operation: &str,
        command: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<u8>, SyncError> {
        let response = self
            .http
            .post(self.url(command)?)
            .query(query)
            .send()
            .await
            .map_err(transport(operation))?;
        success_body(operation, response).await
    }
}

#[async_trait]
impl PinStore for LocalStoreClient {
    async fn add_pin(&self, cid: &Cid) -> Result<(), SyncError> {
        let operation = format!("kubo pin/add {cid}");
        self.post(
            &operation,
            "pin/add",
            &[("arg", cid.as_str()), ("recursive", "true")],
        )
        .await
        .map(|_| ())
    }

    async fn list_pinned(&self) -> Result<PinnedSet, SyncError> {
        const OPERATION: &str = "kubo pin/ls";

        let body = self
            .post(OPERATION, "pin/ls", &[("type", "recursive")])
            .await?;
        let listing: PinLsResponse = decode(OPERATION, &body)?;
        Ok(listing.keys.into_keys().map(Cid::from).collect())
    }

    async fn is_healthy(&self) -> bool {
        match self.post("kubo id", "id", &[]).await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(error = %err, "local store health check failed");
                false
            }
        }
    }
}
