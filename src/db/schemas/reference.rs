//! Reference document schema
//!
//! One record per ordered (submitter, target) pair. Field names match the
//! wire format so stored documents read back exactly as they are exposed.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Collection name for references
pub const REFERENCE_COLLECTION: &str = "references";

/// How the submitter rates the other party
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Recommend {
    Yes,
    No,
    Unknown,
}

impl Recommend {
    /// Parse the wire value; anything else is invalid
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Unknown => "unknown",
        }
    }
}

/// One stored reference
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReferenceDoc {
    /// Assigned by MongoDB on insert
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Submitter's user id
    #[serde(rename = "userFrom")]
    pub user_from: ObjectId,

    /// Target's user id
    #[serde(rename = "userTo")]
    pub user_to: ObjectId,

    /// When the reference was created
    pub created: DateTime,

    /// The parties met in person
    #[serde(default)]
    pub met: bool,

    /// The target hosted the submitter
    #[serde(rename = "hostedMe", default)]
    pub hosted_me: bool,

    /// The submitter hosted the target
    #[serde(rename = "hostedThem", default)]
    pub hosted_them: bool,

    /// Omitted entirely when the submitter declined to say
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommend: Option<Recommend>,

    /// False until both sides have submitted; flips once, never back
    #[serde(default)]
    pub public: bool,
}

impl IntoIndexes for ReferenceDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // At most one reference per ordered (userFrom, userTo) pair;
            // concurrent duplicate submissions race here, not in the service
            (
                doc! { "userFrom": 1, "userTo": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("userFrom_userTo_unique".to_string())
                        .build(),
                ),
            ),
            // Public read path
            (
                doc! { "public": 1 },
                Some(
                    IndexOptions::builder()
                        .name("public_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
