//! Storage backend abstraction
//!
//! [`DocumentStore`] is the only seam between accessors and a concrete
//! database. Backends that cannot batch lookups inherit the one-by-one
//! `find_by_ids` fallback.

use async_trait::async_trait;
use bson::oid::ObjectId;
use serde::{de::DeserializeOwned, Serialize};

use crate::db::filter::{Filter, Pagination};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::update::Update;
use crate::types::Result;

/// A persisted document type with its own collection
pub trait Entity:
    Serialize
    + DeserializeOwned
    + Clone
    + Unpin
    + Send
    + Sync
    + Default
    + IntoIndexes
    + MutMetadata
    + 'static
{
    /// Collection name in the database
    const COLLECTION: &'static str;

    fn id(&self) -> Option<ObjectId>;

    fn set_id(&mut self, id: ObjectId);
}

/// Raw document storage for one collection
#[async_trait]
pub trait DocumentStore<T: Entity>: Send + Sync {
    /// Fetch a live (not soft-deleted) document by id
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<T>>;

    /// Fetch live documents matching `filter`, ordered by id
    async fn find(&self, filter: &Filter, window: Option<Pagination>) -> Result<Vec<T>>;

    /// Count live documents matching `filter`
    async fn count(&self, filter: &Filter) -> Result<u64>;

    /// Insert a document that already carries its id
    async fn insert(&self, item: T) -> Result<ObjectId>;

    /// Replace a live document; `false` when nothing matched
    async fn replace(&self, id: ObjectId, item: T) -> Result<bool>;

    /// Apply `update` to a live document in one atomic step, returning the
    /// document as it stands afterwards; `None` when nothing matched
    async fn update(&self, id: ObjectId, update: &Update) -> Result<Option<T>>;

    /// Fetch every live document whose id is in `ids`, in no particular order
    async fn find_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<T>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = self.find_by_id(*id).await? {
                found.push(item);
            }
        }
        Ok(found)
    }
}
