//! MongoDB client and collection wrapper

use bson::{doc, Document};
use futures_util::{StreamExt, TryStreamExt};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::types::{PeacemakingError, Result};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping the database
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast when MongoDB is unreachable
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri).await.map_err(|e| {
            PeacemakingError::Database(format!("Failed to connect to MongoDB: {}", e))
        })?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| PeacemakingError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its indexes applied
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection
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
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner.create_indexes(indices).await.map_err(|e| {
            PeacemakingError::Database(format!(
                "Failed to create indexes on {}: {}",
                self.inner.name(),
                e
            ))
        })?;

        Ok(())
    }

    /// Duplicate keys surface as `Conflict`
    pub async fn insert_one(&self, item: &T) -> Result<()> {
        self.inner.insert_one(item).await?;
        Ok(())
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        Ok(self.inner.find_one(filter).await?)
    }

    pub async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
        limit: Option<i64>,
    ) -> Result<Vec<T>> {
        let mut action = self.inner.find(filter);
        if let Some(sort) = sort {
            action = action.sort(sort);
        }
        if let Some(limit) = limit {
            action = action.limit(limit);
        }
        let cursor = action.await?;

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

    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult> {
        Ok(self.inner.update_one(filter, update).await?)
    }

    pub async fn replace_one(&self, filter: Document, item: &T) -> Result<UpdateResult> {
        Ok(self.inner.replace_one(filter, item).await?)
    }

    pub async fn update_many(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult> {
        Ok(self.inner.update_many(filter, update).await?)
    }

    pub async fn delete_one(&self, filter: Document) -> Result<u64> {
        Ok(self.inner.delete_one(filter).await?.deleted_count)
    }

    pub async fn delete_many(&self, filter: Document) -> Result<u64> {
        Ok(self.inner.delete_many(filter).await?.deleted_count)
    }

    pub async fn count(&self, filter: Document) -> Result<i64> {
        Ok(self.inner.count_documents(filter).await? as i64)
    }

    /// Run a pipeline and collect raw result documents
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        let cursor = self.inner.aggregate(pipeline).await?;
        Ok(cursor.try_collect::<Vec<Document>>().await?)
    }
}
