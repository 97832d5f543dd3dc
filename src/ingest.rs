//! HTTP surface: `GET /health`, `POST /ingest`, and a JSON 404 for
//! everything else.
//!
//! ## Routes
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Liveness probe with the current UTC time |
//! | POST | `/ingest` | Validate a JSON object and relay it by email |
//!
//! `POST /ingest` runs a short-circuiting pipeline: check `Content-Length`
//! against the ceiling, read exactly that many bytes, parse an object,
//! resolve routing, relay, respond. The first failing step produces the
//! response; see [`IngestError`] for the status mapping.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::error::IngestError;
use crate::json::{self, Timestamp};
use crate::relay::Relay;
use crate::routing::RoutingDecision;
use crate::SERVICE_NAME;

/// Shared state for routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub relay: Arc<Relay>,
}

/// Build the service router.
pub fn router(config: Arc<ServiceConfig>, relay: Arc<Relay>) -> Router {
    let state = AppState { config, relay };

    Router::new()
        .route("/health", get(health).fallback(not_found))
        .route("/ingest", post(ingest).fallback(not_found))
        .fallback(not_found)
        // The configured ceiling is enforced from Content-Length instead.
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub time_utc: Timestamp,
}

/// Body of a successful `POST /ingest`.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub sent_to: String,
    pub subject: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: SERVICE_NAME,
        time_utc: Timestamp::now_seconds(),
    })
}

/// POST /ingest
async fn ingest(State(state): State<AppState>, headers: HeaderMap, body: Body) -> Response {
    match handle_ingest(&state, &headers, body).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            tracing::warn!(status = err.status().as_u16(), error = %err, "Ingest rejected");
            err.into_response()
        }
    }
}

async fn handle_ingest(
    state: &AppState,
    headers: &HeaderMap,
    body: Body,
) -> Result<IngestResponse, IngestError> {
    let length = content_length(headers, state.config.max_body_bytes)?;

    let bytes = axum::body::to_bytes(body, length)
        .await
        .map_err(|e| IngestError::ReadBody(e.to_string()))?;
    if bytes.len() != length {
        return Err(IngestError::ReadBody(format!(
            "expected {length} bytes, got {}",
            bytes.len()
        )));
    }

    let payload = json::parse_object(&bytes)?;
    let route = RoutingDecision::resolve(&payload, &state.config);

    state
        .relay
        .send(&route.recipient, &route.subject, &payload)
        .await?;

    Ok(IngestResponse {
        ok: true,
        sent_to: route.recipient,
        subject: route.subject,
    })
}

/// Validate `Content-Length`: present, a positive integer, within `limit`.
pub fn content_length(headers: &HeaderMap, limit: u64) -> Result<usize, IngestError> {
    let value = headers
        .get(header::CONTENT_LENGTH)
        .ok_or(IngestError::MissingContentLength)?;
    let raw = value
        .to_str()
        .map_err(|_| IngestError::InvalidContentLength(String::from_utf8_lossy(value.as_bytes()).into_owned()))?
        .trim();
    let length: i64 = raw
        .parse()
        .map_err(|_| IngestError::InvalidContentLength(raw.to_string()))?;

    if length <= 0 {
        return Err(IngestError::EmptyBody);
    }
    let length = length as u64;
    if length > limit {
        return Err(IngestError::BodyTooLarge { length, limit });
    }
    usize::try_from(length).map_err(|_| IngestError::BodyTooLarge { length, limit })
}

/// Fallback for unmatched paths and methods.
async fn not_found(uri: Uri) -> IngestError {
    IngestError::NotFound {
        path: uri.path().to_string(),
    }
}
