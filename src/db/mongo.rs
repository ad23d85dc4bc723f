//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{error, info, warn};

use crate::db::schemas::Metadata;
use crate::types::AgoraError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with common metadata
pub trait MutMetadata {
    fn metadata(&self) -> &Metadata;
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, AgoraError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| AgoraError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection with timeout
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AgoraError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, AgoraError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, AgoraError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        // Apply indexes
        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), AgoraError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| AgoraError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, AgoraError> {
        let metadata = item.mut_metadata();
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| AgoraError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AgoraError::Database("Failed to get inserted ID".into()))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, AgoraError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| AgoraError::Database(format!("Find failed: {}", e)))
    }

    /// Find one document by its ObjectId hex string
    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>, AgoraError> {
        let oid = parse_object_id(id)?;
        self.find_one(doc! { "_id": oid }).await
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, AgoraError> {
        use futures_util::StreamExt;

        let cursor = self
            .inner
            .find(filter)
            .await
            .map_err(|e| AgoraError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Find documents with a server-side sort and optional limit.
    ///
    /// Fails with `IndexMissing` when the store cannot serve the ordered
    /// cursor (no supporting index and the sort exceeds memory limits).
    /// Callers are expected to degrade to `find_many` plus an in-memory
    /// sort when that happens.
    pub async fn find_sorted(
        &self,
        filter: Document,
        sort: Document,
        limit: Option<i64>,
    ) -> Result<Vec<T>, AgoraError> {
        use futures_util::StreamExt;

        let mut find = self.inner.find(filter).sort(sort);
        if let Some(n) = limit {
            find = find.limit(n);
        }

        let mut cursor = find.await.map_err(|e| {
            warn!("Ordered query rejected by store: {}", e);
            AgoraError::IndexMissing(format!(
                "ordered query failed ({}); create a supporting index or use the unordered fallback",
                e
            ))
        })?;

        let mut results = Vec::new();
        while let Some(item) = cursor.next().await {
            match item {
                Ok(d) => results.push(d),
                Err(e) => {
                    // A sort that overruns the in-memory limit surfaces here,
                    // after the cursor was created.
                    warn!("Ordered cursor failed mid-stream: {}", e);
                    return Err(AgoraError::IndexMissing(format!(
                        "ordered query failed ({}); create a supporting index or use the unordered fallback",
                        e
                    )));
                }
            }
        }

        Ok(results)
    }

    /// Update one document, stamping `metadata.updated_at`
    pub async fn update_one(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, AgoraError> {
        let update = with_updated_at(update);

        self.inner
            .update_one(filter, UpdateModifications::Document(update))
            .await
            .map_err(|e| AgoraError::Database(format!("Update failed: {}", e)))
    }

    /// Update many documents, stamping `metadata.updated_at`
    pub async fn update_many(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateResult, AgoraError> {
        let update = with_updated_at(update);

        self.inner
            .update_many(filter, update)
            .await
            .map_err(|e| AgoraError::Database(format!("Update failed: {}", e)))
    }

    /// Delete one document; returns true if a document was removed
    pub async fn delete_one(&self, filter: Document) -> Result<bool, AgoraError> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| AgoraError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count > 0)
    }

    /// Delete all documents matching the filter; returns the removed count
    pub async fn delete_many(&self, filter: Document) -> Result<u64, AgoraError> {
        let result = self
            .inner
            .delete_many(filter)
            .await
            .map_err(|e| AgoraError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count)
    }

    /// Count documents matching the filter
    pub async fn count(&self, filter: Document) -> Result<u64, AgoraError> {
        self.inner
            .count_documents(filter)
            .await
            .map_err(|e| AgoraError::Database(format!("Count failed: {}", e)))
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

/// Merge an `updated_at` stamp into the `$set` clause of an update document
fn with_updated_at(mut update: Document) -> Document {
    let mut set = update.get_document("$set").cloned().unwrap_or_default();
    set.insert("metadata.updated_at", DateTime::now());
    update.insert("$set", set);
    update
}

/// Parse an ObjectId hex string, mapping failure to a validation error
pub fn parse_object_id(id: &str) -> Result<ObjectId, AgoraError> {
    ObjectId::parse_str(id)
        .map_err(|_| AgoraError::Validation(format!("invalid record id '{}'", id)))
}

/// In-memory newest-first sort on `metadata.created_at`.
///
/// The unordered half of the index-missing fallback: callers fetch with
/// `find_many` and sort here. Documents without a creation stamp sort last.
pub fn sort_by_created_desc<T: MutMetadata>(items: &mut [T]) {
    items.sort_by(|a, b| {
        let a_ts = a.metadata().created_at;
        let b_ts = b.metadata().created_at;
        match (a_ts, b_ts) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_updated_at_merges_into_set() {
        let update = with_updated_at(doc! { "$set": { "status": "approved" } });
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "approved");
        assert!(set.get("metadata.updated_at").is_some());
    }

    #[test]
    fn test_with_updated_at_creates_set() {
        let update = with_updated_at(doc! { "$unset": { "parent_id": "" } });
        assert!(update
            .get_document("$set")
            .unwrap()
            .get("metadata.updated_at")
            .is_some());
        assert!(update.get_document("$unset").is_ok());
    }

    #[test]
    fn test_parse_object_id_rejects_garbage() {
        assert!(parse_object_id("not-an-oid").is_err());
        assert!(parse_object_id("662fa0c2e4b0a1b2c3d4e5f6").is_ok());
    }
}
