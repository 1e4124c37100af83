//! MongoDB access layer.
//!
//! `MongoCollection` is a thin typed wrapper that applies schema-declared
//! indexes on construction and maps unique-index violations to a typed
//! conflict, so callers never match on driver error codes.

use bson::{doc, oid::ObjectId, Document};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::types::VouchError;

/// Schemas declare their indexes through this trait; the wrapper ensures
/// they exist before the collection is handed out.
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

const DUPLICATE_KEY_CODE: i32 = 11000;

/// True when the driver error is a unique-index violation (E11000)
pub fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping. Short driver timeouts keep startup from hanging
    /// when MongoDB is down, which matters for the dev-mode fallback path.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, VouchError> {
        info!("Connecting to MongoDB at {}", uri);

        let sep = if uri.contains('?') { '&' } else { '?' };
        let uri = format!("{uri}{sep}serverSelectionTimeoutMS=3000&connectTimeoutMS=3000");

        let client = Client::with_uri_str(&uri)
            .await
            .map_err(|e| VouchError::Database(format!("MongoDB connection failed: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| VouchError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("MongoDB database '{}' is reachable", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Open a typed collection, creating its declared indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, VouchError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    pub async fn new(client: &Client, db_name: &str, name: &str) -> Result<Self, VouchError> {
        let this = Self {
            inner: client.database(db_name).collection::<T>(name),
        };
        this.ensure_indexes().await?;
        Ok(this)
    }

    async fn ensure_indexes(&self) -> Result<(), VouchError> {
        let declared = T::into_indices();
        if declared.is_empty() {
            return Ok(());
        }

        let models = declared
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect::<Vec<_>>();

        self.inner
            .create_indexes(models)
            .await
            .map_err(|e| VouchError::Database(format!("Index creation failed: {}", e)))?;

        Ok(())
    }

    /// Insert, surfacing unique-index violations as a typed conflict
    pub async fn insert_one(&self, item: &T) -> Result<ObjectId, VouchError> {
        let result = self.inner.insert_one(item).await.map_err(|e| {
            if is_duplicate_key_error(&e) {
                VouchError::Conflict("Duplicate key".into())
            } else {
                VouchError::Database(format!("Insert failed: {}", e))
            }
        })?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| VouchError::Database("Inserted document has no ObjectId".into()))
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, VouchError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| VouchError::Database(format!("Find failed: {}", e)))
    }

    /// Find all matches. Documents that fail to deserialize are logged and
    /// skipped rather than failing the whole read.
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, VouchError> {
        use futures_util::StreamExt;

        let mut cursor = self
            .inner
            .find(filter)
            .await
            .map_err(|e| VouchError::Database(format!("Find failed: {}", e)))?;

        let mut results = Vec::new();
        while let Some(item) = cursor.next().await {
            match item {
                Ok(doc) => results.push(doc),
                Err(e) => error!("Skipping unreadable document: {}", e),
            }
        }

        Ok(results)
    }

    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, VouchError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| VouchError::Database(format!("Update failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    // Behavior against a live MongoDB is covered manually; see
    // docker-compose.dev.yml for bringing one up locally.
}
