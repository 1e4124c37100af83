//! Member documents as the identity service writes them.
//!
//! The reference service reads the member directory; account lifecycle
//! lives elsewhere. Only profile visibility and display fields matter here.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;

/// Mongo collection holding member accounts
pub const USER_COLLECTION: &str = "users";

/// The subset of a member account this service reads
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    /// Assigned by MongoDB on insert
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Unique handle
    pub username: String,

    /// Name shown on the profile
    #[serde(rename = "displayName", default)]
    pub display_name: String,

    /// Contact address for notification delivery
    #[serde(default)]
    pub email: String,

    /// Whether the profile is publicly discoverable
    #[serde(default)]
    pub public: bool,

    /// When the account was created
    pub created: DateTime,
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on username
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            // Public lookup path
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
