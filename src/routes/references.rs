//! Reference exchange endpoints
//!
//! - POST /api/references - give a reference to another member
//! - GET /api/references - list published references, filterable by giver and receiver
//!
//! Writing a reference requires a Bearer token. The listing is public and only
//! ever returns published references; a pending half of an exchange stays
//! invisible until the other member answers.

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::extract_token_from_header;
use crate::directory::UserRecord;
use crate::reference::format::{error_body, ErrorBody, ReferenceResponse};
use crate::server::AppState;
use crate::types::VouchError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

// =============================================================================
// Request Types
// =============================================================================

/// Query filters for GET /api/references
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    user_from: Option<String>,
    user_to: Option<String>,
}

// =============================================================================
// Response Helpers
// =============================================================================

fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

/// Map a pipeline error to its wire response
fn error_response(err: &VouchError) -> Response<BoxBody> {
    let (status, body) = error_body(err);
    json_response(status, &body)
}

fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T, VouchError> {
    let body = req
        .collect()
        .await
        .map_err(|e| VouchError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > 10240 {
        return Err(VouchError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes).map_err(|e| VouchError::Http(format!("Invalid JSON: {}", e)))
}

fn get_auth_header(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

// =============================================================================
// Authentication Guard
// =============================================================================

/// Resolve the submitting member from the Authorization header.
///
/// Any failure along the chain (missing header, bad token, subject that is not
/// an id, id with no member behind it) collapses to 401 so callers cannot
/// probe which part rejected them.
async fn require_user(
    req: &Request<Incoming>,
    state: &AppState,
) -> Result<UserRecord, Response<BoxBody>> {
    let token = match extract_token_from_header(get_auth_header(req)) {
        Some(token) => token,
        None => {
            return Err(error_response(&VouchError::Unauthorized(
                "Missing authorization token".into(),
            )))
        }
    };

    let claims = match state.jwt.verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            debug!("Rejected token: {}", err);
            return Err(error_response(&VouchError::Unauthorized(
                "Invalid or expired token".into(),
            )));
        }
    };

    let user_id = match ObjectId::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => {
            debug!("Token subject is not a user id: {}", claims.sub);
            return Err(error_response(&VouchError::Unauthorized(
                "Invalid token subject".into(),
            )));
        }
    };

    match state.directory.find_user(user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            debug!("Token subject has no account: {}", user_id.to_hex());
            Err(error_response(&VouchError::Unauthorized(
                "Unknown user".into(),
            )))
        }
        Err(err) => {
            warn!("User lookup failed during auth: {}", err);
            Err(error_response(&err))
        }
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Handle POST /api/references
async fn handle_create_reference(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let submitter = match require_user(&req, &state).await {
        Ok(user) => user,
        Err(response) => return response,
    };

    let payload: serde_json::Value = match parse_json_body(req).await {
        Ok(payload) => payload,
        Err(err) => return error_response(&err),
    };

    match state.references.create(&submitter, &payload).await {
        Ok(saved) => json_response(StatusCode::CREATED, &ReferenceResponse::from_doc(&saved)),
        Err(err) => {
            if err.status_code().is_server_error() {
                warn!("Reference creation failed: {}", err);
            } else {
                info!("Reference submission rejected: {}", err);
            }
            error_response(&err)
        }
    }
}

/// Handle GET /api/references
async fn handle_list_references(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let query = req.uri().query().unwrap_or("");
    let filters: ListQuery = match serde_urlencoded::from_str(query) {
        Ok(filters) => filters,
        Err(_) => {
            return error_response(&VouchError::bad_request("Invalid query string."));
        }
    };

    let user_from = match parse_filter_id("userFrom", filters.user_from.as_deref()) {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };
    let user_to = match parse_filter_id("userTo", filters.user_to.as_deref()) {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };

    match state.references.list_public(user_from, user_to).await {
        Ok(references) => json_response(StatusCode::OK, &references),
        Err(err) => {
            warn!("Reference listing failed: {}", err);
            error_response(&err)
        }
    }
}

/// Parse an optional id filter, treating an empty value as absent
fn parse_filter_id(name: &str, raw: Option<&str>) -> Result<Option<ObjectId>, VouchError> {
    match raw {
        None | Some("") => Ok(None),
        Some(value) => ObjectId::parse_str(value).map(Some).map_err(|_| {
            VouchError::bad_request(format!("Value of {} must be a user id.", name))
        }),
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Route /api/references requests. Returns None for paths outside this prefix.
pub async fn handle_references_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/api/references") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    // Match on the bare path; filters ride in the query string
    let path = path.split('?').next().unwrap_or(path);

    let response = match (method, path) {
        (&Method::POST, "/api/references") => handle_create_reference(req, state).await,
        (&Method::GET, "/api/references") => handle_list_references(req, state).await,

        // Known path, unsupported verb
        (_, "/api/references") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorBody {
                error: "method-not-allowed".to_string(),
                message: "Method not allowed.".to_string(),
                details: Vec::new(),
            },
        ),

        _ => return None,
    };

    Some(response)
}
