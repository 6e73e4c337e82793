//! Common metadata for all documents
//!
//! Tracks creation, update, and soft deletion timestamps.

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Common metadata for all documents
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    /// Soft-deleted documents are invisible to every accessor read
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Stamp a document that is about to be inserted
    pub fn stamp_created(&mut self) {
        let now = DateTime::now();
        self.is_deleted = false;
        self.deleted_at = None;
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    /// Stamp a document that is about to be replaced
    pub fn stamp_updated(&mut self) {
        self.updated_at = Some(DateTime::now());
    }
}
