//! Service document schema
//!
//! A service is something an organization offers, with custom intake fields
//! answered per contact in `service_answers`.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::{document, Metadata};

/// Collection name for services
pub const SERVICE_COLLECTION: &str = "services";

/// Input kind of a custom field
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Date,
    Select,
    Multiselect,
}

/// Custom field declared by a service
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FieldDefinition {
    /// Stable field key referenced by answers
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub field_type: FieldType,
    /// Choices for select fields
    #[serde(default)]
    pub options: Vec<String>,
}

/// Service document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ServiceDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning organization; never changes after creation
    pub org_id: ObjectId,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub fields: Vec<FieldDefinition>,

    #[serde(default)]
    pub tags: Vec<ObjectId>,
}

impl ServiceDoc {
    pub fn new(org_id: ObjectId, name: String) -> Self {
        Self {
            org_id,
            name,
            ..Default::default()
        }
    }

    pub fn defines_field(&self, field_id: &str) -> bool {
        self.fields.iter().any(|f| f.id == field_id)
    }
}

impl IntoIndexes for ServiceDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "org_id": 1, "tags": 1 },
            Some(
                IndexOptions::builder()
                    .name("org_tag_index".to_string())
                    .build(),
            ),
        )]
    }
}

document!(ServiceDoc, SERVICE_COLLECTION);
