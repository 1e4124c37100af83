//! Error type shared across the service.
//!
//! Driver errors are mapped to these variants at the boundary wrappers, so
//! the rest of the code matches on meaning instead of on driver types.
//! `status_code` fixes the HTTP mapping in one place.

use hyper::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum VouchError {
    /// Validation or business-rule rejection, with itemized details
    #[error("Bad request: {}", .0.join(" "))]
    BadRequest(Vec<String>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("NATS error: {0}")]
    Nats(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VouchError {
    /// Shorthand for a single-detail validation rejection
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest(vec![detail.into()])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Nats(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for VouchError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VouchError>;
