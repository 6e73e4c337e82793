//! User document schema
//!
//! Stores credentials and the org-scoped roles of a case worker.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::{PermissionLevel, Role};
use crate::db::mongo::IntoIndexes;
use crate::db::schemas::{document, Metadata};

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Display name
    pub name: String,

    /// Login name, unique across the deployment
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Argon2 password hash
    #[serde(default)]
    pub password_hash: String,

    #[serde(default)]
    pub roles: Vec<Role>,

    /// Token version for invalidation (increment to invalidate all tokens)
    #[serde(default)]
    pub token_version: i32,
}

impl UserDoc {
    pub fn new(name: String, username: String, email: Option<String>, password_hash: String) -> Self {
        Self {
            name,
            username,
            email,
            password_hash,
            token_version: 1,
            ..Default::default()
        }
    }

    /// Add or upgrade the role for an organization
    pub fn grant(&mut self, org_id: ObjectId, permission: PermissionLevel) {
        match self.roles.iter_mut().find(|r| r.org_id == org_id) {
            Some(role) => role.permission = permission,
            None => self.roles.push(Role::new(org_id, permission)),
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "roles.org_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("role_org_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

document!(UserDoc, USER_COLLECTION);
