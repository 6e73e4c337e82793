//! Contact document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::{document, Metadata};

/// Collection name for contacts
pub const CONTACT_COLLECTION: &str = "contacts";

/// A person served by an organization
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ContactDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning organization; never changes after creation
    pub org_id: ObjectId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default)]
    pub tags: Vec<ObjectId>,

    #[serde(default)]
    pub engagements: Vec<ObjectId>,
}

impl ContactDoc {
    pub fn new(org_id: ObjectId, name: String) -> Self {
        Self {
            org_id,
            name,
            ..Default::default()
        }
    }
}

impl IntoIndexes for ContactDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "org_id": 1 },
                Some(IndexOptions::builder().name("org_index".to_string()).build()),
            ),
            (
                doc! { "tags": 1 },
                Some(IndexOptions::builder().name("tag_index".to_string()).build()),
            ),
        ]
    }
}

document!(ContactDoc, CONTACT_COLLECTION);
