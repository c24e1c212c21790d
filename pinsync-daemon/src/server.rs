//! Control-plane HTTP server.
//!
//! Two operations behind a shared bearer secret:
//!
//! - `GET  /api/v1/auto-pin/status`          engine status snapshot
//! - `POST /api/v1/auto-pin/report-missing`  queue identifiers for a priority pin
//!
//! Both are also mounted without the `/api/v1/auto-pin` prefix. Method
//! mismatches answer 405 before authentication is checked.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use pinsync_core::{Cid, ReportMissingRequest, ReportMissingResponse};
use pinsync_sync::Engine;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1 << 20;

/// Identifiers forwarded per report; the rest of the request is ignored.
pub const MAX_REPORTED_CIDS: usize = 100;

#[derive(Clone)]
struct ControlState {
    engine: Arc<Engine>,
    secret: Arc<str>,
}

/// Build the control-plane router for `engine`.
///
/// An empty `pairing_secret` rejects every request.
pub fn router(engine: Arc<Engine>, pairing_secret: impl Into<String>) -> Router {
    let state = ControlState {
        engine,
        secret: Arc::from(pairing_secret.into()),
    };

    Router::new()
        .route("/api/v1/auto-pin/status", get(status))
        .route("/api/v1/auto-pin/report-missing", post(report_missing))
        .route("/status", get(status))
        .route("/report-missing", post(report_missing))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

async fn require_bearer(State(state): State<ControlState>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);

    match presented {
        Some(token) if secret_matches(&state.secret, token) => next.run(request).await,
        _ => {
            tracing::debug!(path = %request.uri().path(), "rejected unauthenticated request");
            error_response(StatusCode::UNAUTHORIZED, "unauthorized")
        }
    }
}

/// Token part of an `Authorization` header; the scheme is case-insensitive.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

fn secret_matches(secret: &str, presented: &str) -> bool {
    !secret.is_empty() && constant_time_eq::constant_time_eq(secret.as_bytes(), presented.as_bytes())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn status(State(state): State<ControlState>) -> Response {
    Json(state.engine.status().await).into_response()
}

async fn report_missing(State(state): State<ControlState>, body: Bytes) -> Response {
    let request: ReportMissingRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(error = %err, "malformed report-missing body");
            return error_response(StatusCode::BAD_REQUEST, "invalid request body");
        }
    };

    let submitted = request.cids.len();
    let valid: Vec<Cid> = request
        .cids
        .into_iter()
        .filter(|candidate| Cid::is_well_formed(candidate))
        .take(MAX_REPORTED_CIDS)
        .map(Cid::from)
        .collect();

    let queued = state.engine.queue_priority(valid);
    tracing::info!(submitted, queued, "report-missing received");
    Json(ReportMissingResponse { queued }).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
