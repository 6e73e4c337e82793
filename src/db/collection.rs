//! Typed collection accessor
//!
//! [`Collection`] is what interactors hold. It owns id parsing, pagination
//! probing and metadata stamping, and delegates raw storage to whichever
//! [`DocumentStore`] backs it.

use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::error;

use crate::db::filter::{Filter, Page, Pagination};
use crate::db::memory::MemoryStore;
use crate::db::mongo::{MongoClient, MutMetadata};
use crate::db::store::{DocumentStore, Entity};
use crate::db::update::Update;
use crate::types::{CaseworkError, Result};

/// Parse a hex document id; malformed ids are a `BadRequest`
pub fn parse_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id.trim()).map_err(CaseworkError::from)
}

/// Accessor for one entity collection
pub struct Collection<T: Entity> {
    store: Arc<dyn DocumentStore<T>>,
}

impl<T: Entity> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore<T>>) -> Self {
        Self { store }
    }

    /// Accessor over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::<T>::new()))
    }

    /// Accessor over the MongoDB collection for `T`
    pub async fn mongo(client: &MongoClient) -> Result<Self> {
        let collection = client.collection::<T>().await?;
        Ok(Self::new(Arc::new(collection)))
    }

    /// Look up a document by its hex id
    pub async fn item_by_id(&self, id: &str) -> Result<Option<T>> {
        let id = parse_id(id)?;
        self.item_by_object_id(id).await
    }

    pub async fn item_by_object_id(&self, id: ObjectId) -> Result<Option<T>> {
        self.store.find_by_id(id).await.inspect_err(|e| log_failure("item_by_id", e))
    }

    /// One page of documents matching `filter`
    pub async fn items(&self, window: Pagination, filter: &Filter) -> Result<Page<T>> {
        let mut items = self
            .store
            .find(filter, Some(window.with_lookahead()))
            .await
            .inspect_err(|e| log_failure("items", e))?;

        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        let has_more = items.len() > limit;
        items.truncate(limit);

        Ok(Page { items, has_more })
    }

    /// Every document matching `filter`
    pub async fn all(&self, filter: &Filter) -> Result<Vec<T>> {
        self.store
            .find(filter, None)
            .await
            .inspect_err(|e| log_failure("all", e))
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64> {
        self.store
            .count(filter)
            .await
            .inspect_err(|e| log_failure("count", e))
    }

    /// Documents for a set of ids; unknown ids are omitted
    pub async fn items_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .find_by_ids(ids)
            .await
            .inspect_err(|e| log_failure("items_by_ids", e))
    }

    /// Assign an id, stamp metadata and store a new document
    pub async fn insert(&self, mut item: T) -> Result<T> {
        let id = item.id().unwrap_or_else(ObjectId::new);
        item.set_id(id);
        item.mut_metadata().stamp_created();

        self.store
            .insert(item.clone())
            .await
            .inspect_err(|e| log_failure("insert", e))?;
        Ok(item)
    }

    /// Replace a stored document, stamping its update time
    pub async fn replace(&self, mut item: T) -> Result<T> {
        let id = item
            .id()
            .ok_or_else(|| CaseworkError::Internal(format!("{} document without id", T::COLLECTION)))?;
        item.mut_metadata().stamp_updated();

        let matched = self
            .store
            .replace(id, item.clone())
            .await
            .inspect_err(|e| log_failure("replace", e))?;

        if !matched {
            return Err(CaseworkError::NotFound(format!("{} {}", T::COLLECTION, id)));
        }
        Ok(item)
    }

    /// Apply field operators atomically, stamping the update time; `None`
    /// when no live document has this id
    pub async fn update(&self, id: ObjectId, update: Update) -> Result<Option<T>> {
        let update = update.set("metadata.updated_at", bson::DateTime::now());
        self.store
            .update(id, &update)
            .await
            .inspect_err(|e| log_failure("update", e))
    }
}

fn log_failure(op: &str, err: &CaseworkError) {
    if matches!(err, CaseworkError::Database(_)) {
        error!(op, error = %err, "storage operation failed");
    }
}
