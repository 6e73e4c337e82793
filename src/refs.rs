//! Stored references and their resolution
//!
//! Documents store other documents by bare id. A [`Ref`] makes the
//! resolved/unresolved distinction explicit, and [`resolve_all`] expands a
//! list of ids with one batch read, applying the [`MissingPolicy`] of the
//! relationship.

use bson::oid::ObjectId;
use std::collections::HashMap;
use tracing::debug;

use crate::db::{Collection, Entity};
use crate::types::{CaseworkError, Result};

/// A reference that may or may not have been looked up yet
#[derive(Debug, Clone, PartialEq)]
pub enum Ref<T> {
    Unresolved(ObjectId),
    Resolved(T),
}

impl<T: Entity> Ref<T> {
    pub fn id(&self) -> Option<ObjectId> {
        match self {
            Ref::Unresolved(id) => Some(*id),
            Ref::Resolved(item) => item.id(),
        }
    }

    /// Look the reference up; a missing target is `MissingReference`
    pub async fn resolve(self, collection: &Collection<T>) -> Result<T> {
        match self {
            Ref::Resolved(item) => Ok(item),
            Ref::Unresolved(id) => collection
                .item_by_object_id(id)
                .await?
                .ok_or_else(|| CaseworkError::missing(T::COLLECTION, id)),
        }
    }
}

impl<T> From<ObjectId> for Ref<T> {
    fn from(id: ObjectId) -> Self {
        Ref::Unresolved(id)
    }
}

/// What to do when a referenced document no longer exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Drop the dangling reference
    Skip,
    /// Fail with `MissingReference`
    Fail,
}

/// Policy for tag references
pub const TAGS: MissingPolicy = MissingPolicy::Skip;

/// Policy for contact, user, engagement and service references
pub const REQUIRED: MissingPolicy = MissingPolicy::Fail;

/// Resolve a list of stored ids, preserving reference order
pub async fn resolve_all<T: Entity>(
    collection: &Collection<T>,
    ids: &[ObjectId],
    policy: MissingPolicy,
) -> Result<Vec<T>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let by_id: HashMap<ObjectId, T> = collection
        .items_by_ids(ids)
        .await?
        .into_iter()
        .filter_map(|item| item.id().map(|id| (id, item)))
        .collect();

    let mut resolved = Vec::with_capacity(ids.len());
    for id in ids {
        // Duplicate ids resolve once per occurrence
        let item = match by_id.get(id) {
            Some(item) => item.clone(),
            None => match policy {
                MissingPolicy::Skip => {
                    debug!(collection = T::COLLECTION, %id, "skipping dangling reference");
                    continue;
                }
                MissingPolicy::Fail => return Err(CaseworkError::missing(T::COLLECTION, id)),
            },
        };
        resolved.push(item);
    }

    Ok(resolved)
}

/// Resolve an optional reference; an unset reference is `None`, a dangling
/// one is `MissingReference`
pub async fn resolve_optional<T: Entity>(
    collection: &Collection<T>,
    id: Option<ObjectId>,
) -> Result<Option<T>> {
    match id {
        None => Ok(None),
        Some(id) => Ref::Unresolved(id).resolve(collection).await.map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{ContactDoc, TagDoc};

    #[tokio::test]
    async fn test_tags_skip_missing_and_keep_order() {
        let tags = Collection::<TagDoc>::in_memory();
        let b = tags
            .insert(TagDoc::new("b".into(), String::new(), "c".into()))
            .await
            .unwrap();
        let a = tags
            .insert(TagDoc::new("a".into(), String::new(), "c".into()))
            .await
            .unwrap();
        let ids = [a._id.unwrap(), ObjectId::new(), b._id.unwrap()];

        let resolved = resolve_all(&tags, &ids, TAGS).await.unwrap();
        let labels: Vec<_> = resolved.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_required_fails_on_missing() {
        let contacts = Collection::<ContactDoc>::in_memory();
        let kept = contacts
            .insert(ContactDoc::new(ObjectId::new(), "Kim".into()))
            .await
            .unwrap();
        let gone = ObjectId::new();

        let err = resolve_all(&contacts, &[kept._id.unwrap(), gone], REQUIRED)
            .await
            .unwrap_err();
        match err {
            CaseworkError::MissingReference { collection, id } => {
                assert_eq!(collection, "contacts");
                assert_eq!(id, gone.to_hex());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_optional_reference() {
        let contacts = Collection::<ContactDoc>::in_memory();
        assert!(resolve_optional(&contacts, None).await.unwrap().is_none());
        assert!(resolve_optional(&contacts, Some(ObjectId::new())).await.is_err());
    }
}
