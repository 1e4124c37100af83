//! Reference persistence
//!
//! The store owns the one-record-per-pair invariant and the single legal
//! mutation (the public flip). Callers never see driver error codes; a
//! duplicate pair comes back as a typed conflict.

use bson::{doc, oid::ObjectId};
use dashmap::DashMap;

use crate::db::schemas::ReferenceDoc;
use crate::db::MongoCollection;
use crate::types::{Result, VouchError};

/// Trait for reference persistence - allows swapping implementations
/// (in-memory for dev, MongoDB for prod)
#[async_trait::async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Find the reference written by `user_from` about `user_to`
    async fn find_one(
        &self,
        user_from: ObjectId,
        user_to: ObjectId,
    ) -> Result<Option<ReferenceDoc>>;

    /// Persist a new reference, returning the stored record with its id
    ///
    /// A second record for the same ordered pair comes back as
    /// `VouchError::Conflict`, surfaced from the unique index.
    async fn insert(&self, reference: ReferenceDoc) -> Result<ReferenceDoc>;

    /// Flip a reference public; the reverse transition does not exist
    async fn set_public(&self, id: ObjectId) -> Result<()>;

    /// All public references, optionally filtered by either side
    async fn find_public(
        &self,
        user_from: Option<ObjectId>,
        user_to: Option<ObjectId>,
    ) -> Result<Vec<ReferenceDoc>>;
}

/// MongoDB-backed reference store
pub struct MongoReferenceStore {
    references: MongoCollection<ReferenceDoc>,
}

impl MongoReferenceStore {
    pub fn new(references: MongoCollection<ReferenceDoc>) -> Self {
        Self { references }
    }
}

#[async_trait::async_trait]
impl ReferenceStore for MongoReferenceStore {
    async fn find_one(
        &self,
        user_from: ObjectId,
        user_to: ObjectId,
    ) -> Result<Option<ReferenceDoc>> {
        self.references
            .find_one(doc! { "userFrom": user_from, "userTo": user_to })
            .await
    }

    async fn insert(&self, mut reference: ReferenceDoc) -> Result<ReferenceDoc> {
        let id = self
            .references
            .insert_one(&reference)
            .await
            .map_err(|e| match e {
                VouchError::Conflict(_) => {
                    VouchError::Conflict("Reference for this pair already exists".into())
                }
                other => other,
            })?;

        reference._id = Some(id);
        Ok(reference)
    }

    async fn set_public(&self, id: ObjectId) -> Result<()> {
        self.references
            .update_one(doc! { "_id": id }, doc! { "$set": { "public": true } })
            .await?;
        Ok(())
    }

    async fn find_public(
        &self,
        user_from: Option<ObjectId>,
        user_to: Option<ObjectId>,
    ) -> Result<Vec<ReferenceDoc>> {
        let mut filter = doc! { "public": true };
        if let Some(id) = user_from {
            filter.insert("userFrom", id);
        }
        if let Some(id) = user_to {
            filter.insert("userTo", id);
        }

        self.references.find_many(filter).await
    }
}

/// In-memory reference store for dev mode and tests
#[derive(Default)]
pub struct MemoryReferenceStore {
    by_pair: DashMap<(ObjectId, ObjectId), ReferenceDoc>,
}

impl MemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ReferenceStore for MemoryReferenceStore {
    async fn find_one(
        &self,
        user_from: ObjectId,
        user_to: ObjectId,
    ) -> Result<Option<ReferenceDoc>> {
        Ok(self
            .by_pair
            .get(&(user_from, user_to))
            .map(|entry| entry.clone()))
    }

    async fn insert(&self, mut reference: ReferenceDoc) -> Result<ReferenceDoc> {
        use dashmap::mapref::entry::Entry;

        let key = (reference.user_from, reference.user_to);
        match self.by_pair.entry(key) {
            Entry::Occupied(_) => Err(VouchError::Conflict(
                "Reference for this pair already exists".into(),
            )),
            Entry::Vacant(slot) => {
                reference._id = Some(ObjectId::new());
                slot.insert(reference.clone());
                Ok(reference)
            }
        }
    }

    async fn set_public(&self, id: ObjectId) -> Result<()> {
        // Same semantics as an update by _id: missing id is a no-op
        for mut entry in self.by_pair.iter_mut() {
            if entry._id == Some(id) {
                entry.public = true;
                break;
            }
        }
        Ok(())
    }

    async fn find_public(
        &self,
        user_from: Option<ObjectId>,
        user_to: Option<ObjectId>,
    ) -> Result<Vec<ReferenceDoc>> {
        let mut results: Vec<ReferenceDoc> = self
            .by_pair
            .iter()
            .filter(|entry| entry.public)
            .filter(|entry| user_from.map_or(true, |id| entry.user_from == id))
            .filter(|entry| user_to.map_or(true, |id| entry.user_to == id))
            .map(|entry| entry.clone())
            .collect();

        // Map iteration order is arbitrary; keep output stable
        results.sort_by_key(|reference| reference.created);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::DateTime;
    use crate::db::Recommend;

    // MongoReferenceStore is covered by integration against a running
    // MongoDB instance; see docker-compose.dev.yml

    fn reference(user_from: ObjectId, user_to: ObjectId, public: bool) -> ReferenceDoc {
        ReferenceDoc {
            _id: None,
            user_from,
            user_to,
            created: DateTime::now(),
            met: true,
            hosted_me: false,
            hosted_them: false,
            recommend: Some(Recommend::Yes),
            public,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_finds_back() {
        let store = MemoryReferenceStore::new();
        let (a, b) = (ObjectId::new(), ObjectId::new());

        let stored = store.insert(reference(a, b, false)).await.unwrap();
        assert!(stored._id.is_some());

        let found = store.find_one(a, b).await.unwrap().unwrap();
        assert_eq!(found._id, stored._id);

        // The opposite direction is a different pair
        assert!(store.find_one(b, a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_pair_conflicts() {
        let store = MemoryReferenceStore::new();
        let (a, b) = (ObjectId::new(), ObjectId::new());

        store.insert(reference(a, b, false)).await.unwrap();
        let err = store.insert(reference(a, b, false)).await.unwrap_err();
        assert!(matches!(err, VouchError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_set_public_flips_once() {
        let store = MemoryReferenceStore::new();
        let (a, b) = (ObjectId::new(), ObjectId::new());

        let stored = store.insert(reference(a, b, false)).await.unwrap();
        let id = stored._id.unwrap();

        store.set_public(id).await.unwrap();
        let found = store.find_one(a, b).await.unwrap().unwrap();
        assert!(found.public);

        // Flipping again changes nothing
        store.set_public(id).await.unwrap();
        assert!(store.find_one(a, b).await.unwrap().unwrap().public);
    }

    #[tokio::test]
    async fn test_find_public_filters() {
        let store = MemoryReferenceStore::new();
        let (a, b, c) = (ObjectId::new(), ObjectId::new(), ObjectId::new());

        store.insert(reference(a, b, true)).await.unwrap();
        store.insert(reference(b, a, true)).await.unwrap();
        store.insert(reference(a, c, false)).await.unwrap();

        let all = store.find_public(None, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let from_a = store.find_public(Some(a), None).await.unwrap();
        assert_eq!(from_a.len(), 1);
        assert_eq!(from_a[0].user_to, b);

        let to_a = store.find_public(None, Some(a)).await.unwrap();
        assert_eq!(to_a.len(), 1);
        assert_eq!(to_a[0].user_from, b);

        // The private record never shows up
        let to_c = store.find_public(None, Some(c)).await.unwrap();
        assert!(to_c.is_empty());
    }
}
