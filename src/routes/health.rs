//! Liveness, readiness and version endpoints.
//!
//! /health and /healthz answer 200 whenever the process is up; the body
//! carries backend detail for operators. /ready and /readyz gate on MongoDB
//! and NATS being connected, except in dev mode where the in-memory
//! fallbacks count as ready. /version reports what build is deployed.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    /// "online" or "degraded", for dashboards
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since the process started
    pub uptime: u64,
    pub timestamp: String,
    pub mode: &'static str,
    pub node_id: String,
    /// Reference store (MongoDB)
    pub storage: BackendHealth,
    /// Notification relay (NATS)
    pub relay: BackendHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct BackendHealth {
    pub connected: bool,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let args = &state.args;

    let storage_up = state.mongo.is_some();
    // NATS exposes live connection state; report it rather than whether the
    // initial connect succeeded.
    let relay_up = state.nats.as_ref().is_some_and(|n| n.is_connected());
    let all_up = storage_up && relay_up;

    let error = match (all_up, args.dev_mode) {
        (true, _) => None,
        (false, true) => Some(format!(
            "Dev mode: running on in-memory fallbacks (mongodb: {}, nats: {})",
            storage_up, relay_up
        )),
        (false, false) => Some(format!(
            "Backend unavailable (mongodb: {}, nats: {})",
            storage_up, relay_up
        )),
    };

    HealthResponse {
        healthy: true,
        status: if all_up || args.dev_mode { "online" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if args.dev_mode { "development" } else { "production" },
        node_id: args.node_id.to_string(),
        storage: BackendHealth { connected: storage_up },
        relay: BackendHealth { connected: relay_up },
        error,
    }
}

fn json_probe_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Liveness probe. Always 200 while the process runs.
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let report = build_health_response(&state);
    let body = serde_json::to_string(&report)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());

    json_probe_response(StatusCode::OK, body)
}

/// Readiness probe for load balancers. 503 until both backends are
/// connected; dev mode is always ready because the fallbacks serve.
pub fn readiness_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let report = build_health_response(&state);
    let ready = state.args.dev_mode || (report.storage.connected && report.relay.connected);

    let body = serde_json::to_string(&report)
        .unwrap_or_else(|_| r#"{"healthy":false,"error":"Serialization failed"}"#.to_string());

    json_probe_response(
        if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE },
        body,
    )
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Build stamps for deployment verification; values come from build.rs
pub fn version_info() -> Response<Full<Bytes>> {
    let report = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "vouch",
    };

    let body = serde_json::to_string(&report)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());

    json_probe_response(StatusCode::OK, body)
}
