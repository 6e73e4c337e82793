//! Health check endpoint
//!
//! `/health` and `/healthz` report liveness only: the process is up and
//! serving. Storage reachability is not checked.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::server::http::json_response;
use crate::server::AppState;

/// Liveness report
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Git revision the binary was built from
    pub revision: &'static str,
    pub built_at: &'static str,
    pub storage: String,
    /// Subscription channels with at least one listener
    pub active_channels: usize,
    pub uptime: u64,
    pub mode: &'static str,
}

impl HealthResponse {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            revision: env!("CASEWORK_GIT_REVISION"),
            built_at: env!("CASEWORK_BUILT_AT"),
            storage: state.storage.to_string(),
            active_channels: state.publisher.active_channels(),
            uptime: state.uptime_secs(),
            mode: if state.args.dev_mode {
                "development"
            } else {
                "production"
            },
        }
    }
}

/// GET /health, /healthz
pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(&HealthResponse::from_state(state))
        .unwrap_or_else(|_| r#"{"status":"ok"}"#.to_string());
    json_response(StatusCode::OK, body)
}
