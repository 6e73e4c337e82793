//! Engagement document schema
//!
//! An engagement is one piece of case work with one or more contacts,
//! optionally assigned to a case worker.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::{document, Metadata};

/// Collection name for engagements
pub const ENGAGEMENT_COLLECTION: &str = "engagements";

/// Engagement lifecycle status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, async_graphql::Enum,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum EngagementStatus {
    #[default]
    Open,
    Assigned,
    Closed,
    Completed,
}

impl EngagementStatus {
    /// Stored string form, as used in filters
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementStatus::Open => "OPEN",
            EngagementStatus::Assigned => "ASSIGNED",
            EngagementStatus::Closed => "CLOSED",
            EngagementStatus::Completed => "COMPLETED",
        }
    }
}

/// Engagement document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct EngagementDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Owning organization; never changes after creation
    pub org_id: ObjectId,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: EngagementStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime>,

    /// Assigned case worker, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ObjectId>,

    #[serde(default)]
    pub contacts: Vec<ObjectId>,

    #[serde(default)]
    pub tags: Vec<ObjectId>,
}

impl EngagementDoc {
    pub fn new(org_id: ObjectId, title: String) -> Self {
        Self {
            org_id,
            title,
            ..Default::default()
        }
    }
}

impl IntoIndexes for EngagementDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "org_id": 1, "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("org_status_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "tags": 1 },
                Some(IndexOptions::builder().name("tag_index".to_string()).build()),
            ),
        ]
    }
}

document!(EngagementDoc, ENGAGEMENT_COLLECTION);
