//! HTTP routes for Vouch

pub mod health;
pub mod references;

pub use health::{health_check, readiness_check, version_info};
pub use references::handle_references_request;
