//! HTTP front door.
//!
//! One hyper http1 connection task per client, all sharing `AppState`.
//! Routing is a flat match; the reference API lives under /api/references
//! and everything else is probes and version info.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::MongoClient;
use crate::directory::UserDirectory;
use crate::nats::NatsClient;
use crate::reference::ReferenceService;
use crate::routes;
use crate::types::VouchError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Everything a request handler can reach
pub struct AppState {
    pub args: Args,
    /// None when dev mode falls back to in-memory storage
    pub mongo: Option<MongoClient>,
    /// None when dev mode falls back to log-only notifications
    pub nats: Option<NatsClient>,
    /// Verifier for Authorization bearer tokens
    pub jwt: JwtValidator,
    /// Member lookup used by auth and profile expansion
    pub directory: Arc<dyn UserDirectory>,
    /// Reference exchange pipeline
    pub references: Arc<ReferenceService>,
    /// Process start, for uptime reporting
    pub started: Instant,
}

impl AppState {
    pub fn new(
        args: Args,
        mongo: Option<MongoClient>,
        nats: Option<NatsClient>,
        jwt: JwtValidator,
        directory: Arc<dyn UserDirectory>,
        references: Arc<ReferenceService>,
    ) -> Self {
        Self {
            args,
            mongo,
            nats,
            jwt,
            directory,
            references,
            started: Instant::now(),
        }
    }
}

/// Accept loop. Runs until the process is stopped.
pub async fn run(state: Arc<AppState>) -> Result<(), VouchError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Vouch listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - using built-in signing secret");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Connection from {} ended with error: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Accept failed: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // The reference API consumes the request (body access)
    if path.starts_with("/api/references") {
        if let Some(response) = routes::handle_references_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(to_boxed(not_found_response(&path)));
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)))
        }

        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            to_boxed(routes::readiness_check(Arc::clone(&state)))
        }

        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // CORS preflight for anything outside the reference API
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        _ => to_boxed(not_found_response(&path)),
    };

    Ok(response)
}

fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
        "hint": "See /api/references, /health, /ready, /version"
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
