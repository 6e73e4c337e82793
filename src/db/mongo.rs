//! MongoDB client and collection wrapper

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use crate::db::filter::{Filter, Pagination};
use crate::db::schemas::Metadata;
use crate::db::store::{DocumentStore, Entity};
use crate::db::update::Update;
use crate::types::{CaseworkError, Result};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
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

        // Fail fast when MongoDB is unreachable instead of hanging at startup
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| CaseworkError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CaseworkError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Open the typed collection for `T`, creating its indexes
    pub async fn collection<T: Entity>(&self) -> Result<MongoCollection<T>> {
        MongoCollection::new(&self.client, &self.db_name, T::COLLECTION).await
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
    T: Entity,
{
    inner: Collection<T>,
}

impl<T: Entity> MongoCollection<T> {
    /// Create a new collection and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<()> {
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
            .map_err(|e| CaseworkError::Database(format!("Failed to create indexes: {}", e)))?;

        debug!("Indexes ensured on '{}'", T::COLLECTION);
        Ok(())
    }

    /// Filter document restricted to live documents
    fn live(filter: &Filter) -> Document {
        let mut full_filter = filter.to_document();
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });
        full_filter
    }
}

#[async_trait]
impl<T: Entity> DocumentStore<T> for MongoCollection<T> {
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<T>> {
        self.inner
            .find_one(Self::live(&Filter::by_id(id)))
            .await
            .map_err(|e| CaseworkError::Database(format!("Find failed: {}", e)))
    }

    async fn find(&self, filter: &Filter, window: Option<Pagination>) -> Result<Vec<T>> {
        let mut find = self.inner.find(Self::live(filter)).sort(doc! { "_id": 1 });
        if let Some(window) = window {
            find = find.skip(window.offset).limit(window.limit);
        }

        let cursor = find
            .await
            .map_err(|e| CaseworkError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect::<Vec<T>>()
            .await
            .map_err(|e| CaseworkError::Database(format!("Cursor read failed: {}", e)))
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        self.inner
            .count_documents(Self::live(filter))
            .await
            .map_err(|e| CaseworkError::Database(format!("Count failed: {}", e)))
    }

    async fn insert(&self, item: T) -> Result<ObjectId> {
        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| CaseworkError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| CaseworkError::Database("Failed to get inserted ID".into()))
    }

    async fn replace(&self, id: ObjectId, item: T) -> Result<bool> {
        let result = self
            .inner
            .replace_one(Self::live(&Filter::by_id(id)), item)
            .await
            .map_err(|e| CaseworkError::Database(format!("Replace failed: {}", e)))?;

        Ok(result.matched_count > 0)
    }

    async fn update(&self, id: ObjectId, update: &Update) -> Result<Option<T>> {
        self.inner
            .find_one_and_update(Self::live(&Filter::by_id(id)), update.to_document())
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| CaseworkError::Database(format!("Update failed: {}", e)))
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = Filter::new().one_of("_id", ids.iter().copied());
        self.find(&filter, None).await
    }
}
