//! Response shaping
//!
//! Maps stored records and pipeline failures to the small set of wire
//! shapes the API exposes. The projection is structural: a field that is
//! not declared here cannot leak out.

use std::collections::HashMap;

use bson::oid::ObjectId;
use chrono::SecondsFormat;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

use crate::db::schemas::{Recommend, ReferenceDoc};
use crate::directory::MiniProfile;
use crate::types::VouchError;

/// Public projection of a reference record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub public: bool,
    pub user_from: String,
    pub user_to: String,
    pub created: String,
    pub met: bool,
    pub hosted_me: bool,
    pub hosted_them: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommend: Option<Recommend>,
}

impl ReferenceResponse {
    /// Project a stored record into its public shape
    pub fn from_doc(doc: &ReferenceDoc) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            public: doc.public,
            user_from: doc.user_from.to_hex(),
            user_to: doc.user_to.to_hex(),
            created: format_created(doc),
            met: doc.met,
            hosted_me: doc.hosted_me,
            hosted_them: doc.hosted_them,
            recommend: doc.recommend,
        }
    }
}

/// List-view projection with mini-profile-expanded user fields
///
/// A vanished account leaves null in place of the profile, the same way
/// a dangling reference resolves on the read side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedReference {
    #[serde(rename = "_id")]
    pub id: String,
    pub public: bool,
    pub user_from: Option<MiniProfile>,
    pub user_to: Option<MiniProfile>,
    pub created: String,
    pub met: bool,
    pub hosted_me: bool,
    pub hosted_them: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommend: Option<Recommend>,
}

impl ListedReference {
    pub fn from_doc(doc: &ReferenceDoc, profiles: &HashMap<ObjectId, MiniProfile>) -> Self {
        Self {
            id: doc._id.map(|id| id.to_hex()).unwrap_or_default(),
            public: doc.public,
            user_from: profiles.get(&doc.user_from).cloned(),
            user_to: profiles.get(&doc.user_to).cloned(),
            created: format_created(doc),
            met: doc.met,
            hosted_me: doc.hosted_me,
            hosted_them: doc.hosted_them,
            recommend: doc.recommend,
        }
    }
}

fn format_created(doc: &ReferenceDoc) -> String {
    doc.created
        .to_chrono()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Error body returned for any failed request
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Machine-readable kind
    pub error: String,
    /// Categorical human message
    pub message: String,
    /// Itemized validation details
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Map a pipeline failure to its wire shape
///
/// Dependency failures deliberately collapse to a generic message; the
/// specific cause belongs in the log, not on the wire.
pub fn error_body(err: &VouchError) -> (StatusCode, ErrorBody) {
    let status = err.status_code();
    let (kind, message, details) = match err {
        VouchError::BadRequest(details) => ("bad-request", "Bad request.", details.clone()),
        VouchError::Http(_) => ("bad-request", "Bad request.", Vec::new()),
        VouchError::Unauthorized(_) => ("unauthorized", "Unauthorized.", Vec::new()),
        VouchError::NotFound(_) => ("not-found", "Not found.", Vec::new()),
        VouchError::Conflict(_) => ("conflict", "Conflict.", Vec::new()),
        VouchError::Database(_) | VouchError::Nats(_) => (
            "service-unavailable",
            "Something went wrong. Please try again later.",
            Vec::new(),
        ),
        VouchError::Internal(_) | VouchError::Config(_) => (
            "internal",
            "Something went wrong. Please try again later.",
            Vec::new(),
        ),
    };

    (
        status,
        ErrorBody {
            error: kind.to_string(),
            message: message.to_string(),
            details,
        },
    )
}
