//! Response handling shared by the remote directory and local store clients.

use serde::de::DeserializeOwned;

use crate::error::SyncError;

pub(crate) fn transport(operation: impl Into<String>) -> impl FnOnce(reqwest::Error) -> SyncError {
    let operation = operation.into();
    move |source| SyncError::Transport { operation, source }
}

/// Read the full body of a response, failing on any non-2xx status.
///
/// The body of a failed response is kept in the error for diagnosis.
pub(crate) async fn success_body(
    operation: &str,
    response: reqwest::Response,
) -> Result<Vec<u8>, SyncError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SyncError::Status {
            operation: operation.to_string(),
            status: status.as_u16(),
            body: body.trim().to_string(),
        });
    }

    let body = response.bytes().await.map_err(transport(operation))?;
    Ok(body.to_vec())
}

pub(crate) fn decode<T: DeserializeOwned>(operation: &str, body: &[u8]) -> Result<T, SyncError> {
    serde_json::from_slice(body).map_err(|source| SyncError::Decode {
        operation: operation.to_string(),
        source,
    })
}
