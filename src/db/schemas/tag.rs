//! Tag document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::{document, Metadata};

/// Collection name for tags
pub const TAG_COLLECTION: &str = "tags";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TagDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub label: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: String,
}

impl TagDoc {
    pub fn new(label: String, description: String, category: String) -> Self {
        Self {
            label,
            description,
            category,
            ..Default::default()
        }
    }
}

impl IntoIndexes for TagDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "category": 1 },
            Some(
                IndexOptions::builder()
                    .name("category_index".to_string())
                    .build(),
            ),
        )]
    }
}

document!(TagDoc, TAG_COLLECTION);
