//! Service answer document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::{document, Metadata};

/// Collection name for service answers
pub const SERVICE_ANSWER_COLLECTION: &str = "service_answers";

/// Answer to one custom field: a single value or a list of values
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum AnswerValue {
    Scalar(String),
    List(Vec<String>),
}

impl Default for AnswerValue {
    fn default() -> Self {
        AnswerValue::Scalar(String::new())
    }
}

impl AnswerValue {
    pub fn values(&self) -> Vec<String> {
        match self {
            AnswerValue::Scalar(value) => vec![value.clone()],
            AnswerValue::List(values) => values.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FieldAnswer {
    pub field_id: String,
    pub value: AnswerValue,
}

/// Answers recorded for a service, on behalf of one or more contacts
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ServiceAnswerDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub service_id: ObjectId,

    #[serde(default)]
    pub contacts: Vec<ObjectId>,

    #[serde(default)]
    pub fields: Vec<FieldAnswer>,
}

impl ServiceAnswerDoc {
    pub fn new(service_id: ObjectId, contacts: Vec<ObjectId>, fields: Vec<FieldAnswer>) -> Self {
        Self {
            service_id,
            contacts,
            fields,
            ..Default::default()
        }
    }
}

impl IntoIndexes for ServiceAnswerDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "service_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("service_index".to_string())
                    .build(),
            ),
        )]
    }
}

document!(ServiceAnswerDoc, SERVICE_ANSWER_COLLECTION);
