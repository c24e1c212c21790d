//! Read-only client for the remote pinning service's pin directory.
//!
//! ## Pagination
//!
//! `GET {endpoint}/pins?limit=N` returns the newest `N` pins. The next page is
//! requested with `before=<created of the last entry>`. A page holding fewer
//! than `N` entries is the last one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use pinsync_core::{PinListResponse, RemotePinEntry};

use crate::error::{ListError, SyncError};
use crate::http::{decode, success_body, transport};

/// Entries requested per page.
pub const PAGE_SIZE: usize = 1000;

/// Per-request timeout for the remote service.
pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of the full remote pin list.
#[async_trait]
pub trait PinDirectory: Send + Sync {
    /// Fetch every remote pin record, newest first.
    ///
    /// On failure the records fetched before the failing page are returned
    /// inside the [`ListError`].
    async fn list_all(&self) -> Result<Vec<RemotePinEntry>, ListError>;
}

/// HTTP client for a pinning-service-API compatible remote directory.
#[derive(Debug, Clone)]
pub struct RemoteDirectoryClient {
    pins_url: Url,
    token: String,
    page_size: usize,
    http: reqwest::Client,
}

impl RemoteDirectoryClient {
    pub fn new(endpoint: &str, token: impl Into<String>) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(REMOTE_TIMEOUT)
            .build()
            .map_err(transport("build remote client"))?;
        Self::with_http(endpoint, token, http)
    }

    /// Build around an existing `reqwest::Client` (shared pools, custom TLS).
    pub fn with_http(
        endpoint: &str,
        token: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, SyncError> {
        let pins_url = Url::parse(&format!("{}/pins", endpoint.trim_end_matches('/'))).map_err(
            |err| SyncError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            },
        )?;

        Ok(Self {
            pins_url,
            token: token.into(),
            page_size: PAGE_SIZE,
            http,
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    async fn list_page(&self, before: Option<&str>) -> Result<PinListResponse, SyncError> {
        const OPERATION: &str = "pinning list";

        let mut request = self
            .http
            .get(self.pins_url.clone())
            .bearer_auth(&self.token)
            .query(&[("limit", self.page_size.to_string())]);
        if let Some(cursor) = before {
            request = request.query(&[("before", cursor)]);
        }

        let response = request.send().await.map_err(transport(OPERATION))?;
        let body = success_body(OPERATION, response).await?;
        decode(OPERATION, &body)
    }
}

#[async_trait]
impl PinDirectory for RemoteDirectoryClient {
    async fn list_all(&self) -> Result<Vec<RemotePinEntry>, ListError> {
        let mut all = Vec::new();
        let mut before: Option<String> = None;

        loop {
            let page = match self.list_page(before.as_deref()).await {
                Ok(page) => page,
                Err(source) => {
                    return Err(ListError {
                        partial: all,
                        source,
                    })
                }
            };

            let full_page = page.results.len() >= self.page_size;
            let cursor = page.results.last().map(|entry| entry.created.clone());
            all.extend(page.results);
            tracing::debug!(fetched = all.len(), "fetched remote pin page");

            if !full_page {
                break;
            }

            // A full page without a usable cursor would request the same page
            // forever.
            match cursor {
                Some(cursor) if !cursor.is_empty() && before.as_deref() != Some(cursor.as_str()) => {
                    before = Some(cursor);
                }
                _ => {
                    return Err(ListError {
                        partial: all,
                        source: SyncError::Protocol {
                            operation: "pinning list".to_string(),
                            reason: "full page without an advancing 'created' cursor".to_string(),
                        },
                    })
                }
            }
        }

        Ok(all)
    }
}
