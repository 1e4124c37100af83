//! User directory lookups
//!
//! The reference service reads member profiles; it never writes them.
//! Account lifecycle belongs to the identity service.

use std::collections::HashMap;

use bson::{doc, oid::ObjectId};
use dashmap::DashMap;
use serde::Serialize;

use crate::db::schemas::UserDoc;
use crate::db::MongoCollection;
use crate::types::Result;

/// A directory entry as the reference service sees it
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: ObjectId,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub public: bool,
}

impl UserRecord {
    fn from_doc(doc: UserDoc) -> Option<Self> {
        Some(Self {
            id: doc._id?,
            username: doc.username,
            display_name: doc.display_name,
            email: doc.email,
            public: doc.public,
        })
    }

    /// The only user shape ever exposed through reference responses
    pub fn mini_profile(&self) -> MiniProfile {
        MiniProfile {
            id: self.id.to_hex(),
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Minimal public profile view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub display_name: String,
}

/// Trait for user lookups - allows swapping implementations
/// (in-memory for dev, MongoDB for prod)
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a single user by id
    async fn find_user(&self, id: ObjectId) -> Result<Option<UserRecord>>;

    /// Resolve mini profiles for a set of user ids
    async fn mini_profiles(&self, ids: &[ObjectId]) -> Result<HashMap<ObjectId, MiniProfile>>;
}

/// MongoDB-backed directory
pub struct MongoUserDirectory {
    users: MongoCollection<UserDoc>,
}

impl MongoUserDirectory {
    pub fn new(users: MongoCollection<UserDoc>) -> Self {
        Self { users }
    }
}

#[async_trait::async_trait]
impl UserDirectory for MongoUserDirectory {
    async fn find_user(&self, id: ObjectId) -> Result<Option<UserRecord>> {
        let doc = self.users.find_one(doc! { "_id": id }).await?;
        Ok(doc.and_then(UserRecord::from_doc))
    }

    async fn mini_profiles(&self, ids: &[ObjectId]) -> Result<HashMap<ObjectId, MiniProfile>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let docs = self
            .users
            .find_many(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;

        Ok(docs
            .into_iter()
            .filter_map(UserRecord::from_doc)
            .map(|user| (user.id, user.mini_profile()))
            .collect())
    }
}

/// In-memory directory for dev mode and tests
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: DashMap<ObjectId, UserRecord>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user, returning its id
    pub fn add(&self, username: &str, display_name: &str, email: &str, public: bool) -> ObjectId {
        let id = ObjectId::new();
        self.users.insert(
            id,
            UserRecord {
                id,
                username: username.to_string(),
                display_name: display_name.to_string(),
                email: email.to_string(),
                public,
            },
        );
        id
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_user(&self, id: ObjectId) -> Result<Option<UserRecord>> {
        Ok(self.users.get(&id).map(|entry| entry.clone()))
    }

    async fn mini_profiles(&self, ids: &[ObjectId]) -> Result<HashMap<ObjectId, MiniProfile>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id))
            .map(|entry| (entry.id, entry.mini_profile()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_directory_find() {
        let directory = MemoryUserDirectory::new();
        let id = directory.add("nomad", "Nomad N.", "nomad@example.com", true);

        let user = directory.find_user(id).await.unwrap().unwrap();
        assert_eq!(user.username, "nomad");
        assert!(user.public);

        let missing = directory.find_user(ObjectId::new()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_mini_profiles_resolve_known_ids_only() {
        let directory = MemoryUserDirectory::new();
        let a = directory.add("ana", "Ana", "ana@example.com", true);
        let b = directory.add("bert", "Bert", "bert@example.com", false);

        let profiles = directory
            .mini_profiles(&[a, b, ObjectId::new()])
            .await
            .unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[&a].username, "ana");
        assert_eq!(profiles[&b].username, "bert");
    }

    #[test]
    fn test_mini_profile_wire_shape() {
        let record = UserRecord {
            id: ObjectId::new(),
            username: "ana".to_string(),
            display_name: "Ana A.".to_string(),
            email: "ana@example.com".to_string(),
            public: true,
        };

        let value = serde_json::to_value(record.mini_profile()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(obj.contains_key("_id"));
        assert!(obj.contains_key("username"));
        assert!(obj.contains_key("displayName"));
        // Email never leaks into the public shape
        assert!(!obj.contains_key("email"));
    }
}
