//! Organization document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::PermissionLevel;
use crate::db::mongo::IntoIndexes;
use crate::db::schemas::{document, Metadata};

/// Collection name for organizations
pub const ORGANIZATION_COLLECTION: &str = "organizations";

/// A member entry on the organization side of a role
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MemberRole {
    pub user_id: ObjectId,
    pub org_id: ObjectId,
    #[serde(default)]
    pub permission: PermissionLevel,
}

/// Organization document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct OrganizationDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    /// Member roles, mirrored on each user's `roles`
    #[serde(default)]
    pub users: Vec<MemberRole>,

    #[serde(default)]
    pub contacts: Vec<ObjectId>,

    #[serde(default)]
    pub tags: Vec<ObjectId>,
}

impl OrganizationDoc {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Add or upgrade a member; returns `false` when nothing changed
    pub fn upsert_member(&mut self, user_id: ObjectId, permission: PermissionLevel) -> bool {
        let org_id = self._id.unwrap_or_default();
        match self.users.iter_mut().find(|m| m.user_id == user_id) {
            Some(member) if member.permission == permission => false,
            Some(member) => {
                member.permission = permission;
                true
            }
            None => {
                self.users.push(MemberRole {
                    user_id,
                    org_id,
                    permission,
                });
                true
            }
        }
    }

    pub fn member_ids(&self) -> Vec<ObjectId> {
        self.users.iter().map(|m| m.user_id).collect()
    }
}

impl IntoIndexes for OrganizationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "users.user_id": 1 },
            Some(
                IndexOptions::builder()
                    .name("member_user_index".to_string())
                    .build(),
            ),
        )]
    }
}

document!(OrganizationDoc, ORGANIZATION_COLLECTION);
