//! In-memory document store
//!
//! Used in dev mode when MongoDB is unavailable and throughout the test
//! suite. Documents are serialized to BSON for filter evaluation so queries
//! behave the same as against MongoDB.

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson};
use dashmap::DashMap;
use std::sync::Arc;

use crate::db::filter::{Filter, Pagination};
use crate::db::store::{DocumentStore, Entity};
use crate::db::update::Update;
use crate::types::{CaseworkError, Result};

/// Process-local collection keyed by document id
#[derive(Debug)]
pub struct MemoryStore<T: Entity> {
    docs: Arc<DashMap<ObjectId, T>>,
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            docs: Arc::new(DashMap::new()),
        }
    }
}

impl<T: Entity> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            docs: Arc::clone(&self.docs),
        }
    }
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents, including soft-deleted ones
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Live documents matching `filter`, ordered by id
    fn matching(&self, filter: &Filter) -> Result<Vec<T>> {
        let mut found: Vec<(ObjectId, T)> = Vec::new();

        for entry in self.docs.iter() {
            let doc = bson::to_document(entry.value())?;
            if is_deleted(&doc) || !filter.matches(&doc) {
                continue;
            }
            found.push((*entry.key(), entry.value().clone()));
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found.into_iter().map(|(_, item)| item).collect())
    }
}

fn is_deleted(doc: &bson::Document) -> bool {
    doc.get_document("metadata")
        .ok()
        .and_then(|m| m.get("is_deleted"))
        .is_some_and(|v| matches!(v, Bson::Boolean(true)))
}

#[async_trait]
impl<T: Entity> DocumentStore<T> for MemoryStore<T> {
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<T>> {
        let Some(item) = self.docs.get(&id).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        let doc = bson::to_document(&item)?;
        Ok((!is_deleted(&doc)).then_some(item))
    }

    async fn find(&self, filter: &Filter, window: Option<Pagination>) -> Result<Vec<T>> {
        let all = self.matching(filter)?;
        Ok(match window {
            Some(window) => all
                .into_iter()
                .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(window.limit).unwrap_or(0))
                .collect(),
            None => all,
        })
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        Ok(self.matching(filter)?.len() as u64)
    }

    async fn insert(&self, item: T) -> Result<ObjectId> {
        let id = item
            .id()
            .ok_or_else(|| CaseworkError::Internal("Document inserted without an id".into()))?;

        if self.docs.contains_key(&id) {
            return Err(CaseworkError::Database(format!(
                "Duplicate key in '{}': {}",
                T::COLLECTION,
                id
            )));
        }

        self.docs.insert(id, item);
        Ok(id)
    }

    async fn replace(&self, id: ObjectId, item: T) -> Result<bool> {
        match self.docs.get_mut(&id) {
            Some(mut entry) => {
                let current = bson::to_document(entry.value())?;
                if is_deleted(&current) {
                    return Ok(false);
                }
                *entry.value_mut() = item;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update(&self, id: ObjectId, update: &Update) -> Result<Option<T>> {
        // The entry stays locked from read to write
        let Some(mut entry) = self.docs.get_mut(&id) else {
            return Ok(None);
        };
        let mut doc = bson::to_document(entry.value())?;
        if is_deleted(&doc) {
            return Ok(None);
        }
        update.apply(&mut doc)?;
        let updated: T = bson::from_document(doc)?;
        *entry.value_mut() = updated.clone();
        Ok(Some(updated))
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<T>> {
        let filter = Filter::new().one_of("_id", ids.iter().copied());
        self.matching(&filter)
    }
}
