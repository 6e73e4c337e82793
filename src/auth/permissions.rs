//! Org-scoped roles and the authenticated caller identity
//!
//! A role binds a user to one organization with a permission level. Any role
//! in an organization grants visibility inside it; nothing is visible across
//! organization boundaries.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission level a role grants inside its organization
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    async_graphql::Enum,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionLevel {
    /// Read-only access to the organization's records
    #[default]
    Viewer,
    /// Case worker: create and update contacts, engagements, answers
    Member,
    /// Organization administrator: manage membership
    Admin,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Viewer => write!(f, "VIEWER"),
            PermissionLevel::Member => write!(f, "MEMBER"),
            PermissionLevel::Admin => write!(f, "ADMIN"),
        }
    }
}

/// A user's membership in one organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub org_id: ObjectId,
    #[serde(default)]
    pub permission: PermissionLevel,
}

impl Role {
    pub fn new(org_id: ObjectId, permission: PermissionLevel) -> Self {
        Self { org_id, permission }
    }
}

/// The authenticated caller attached to a request context
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: ObjectId,
    pub username: String,
    pub roles: Vec<Role>,
}

impl Identity {
    /// Whether the caller holds any role in the organization
    pub fn has_role_in(&self, org_id: &ObjectId) -> bool {
        self.roles.iter().any(|r| &r.org_id == org_id)
    }

    /// Highest permission the caller holds in the organization
    pub fn permission_in(&self, org_id: &ObjectId) -> Option<PermissionLevel> {
        self.roles
            .iter()
            .filter(|r| &r.org_id == org_id)
            .map(|r| r.permission)
            .max()
    }

    /// Whether the caller holds at least `level` in the organization
    pub fn can(&self, org_id: &ObjectId, level: PermissionLevel) -> bool {
        self.permission_in(org_id).is_some_and(|p| p >= level)
    }

    /// Whether the caller shares at least one organization with `roles`
    pub fn shares_org_with(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role_in(&r.org_id))
    }

    /// Organization ids the caller belongs to, without duplicates
    pub fn org_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = Vec::with_capacity(self.roles.len());
        for role in &self.roles {
            if !ids.contains(&role.org_id) {
                ids.push(role.org_id);
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(roles: Vec<Role>) -> Identity {
        Identity {
            user_id: ObjectId::new(),
            username: "worker".into(),
            roles,
        }
    }

    #[test]
    fn test_permission_ordering() {
        assert!(PermissionLevel::Admin > PermissionLevel::Member);
        assert!(PermissionLevel::Member > PermissionLevel::Viewer);
    }

    #[test]
    fn test_role_scoping() {
        let org_a = ObjectId::new();
        let org_b = ObjectId::new();
        let caller = identity(vec![Role::new(org_a, PermissionLevel::Member)]);

        assert!(caller.has_role_in(&org_a));
        assert!(!caller.has_role_in(&org_b));
        assert!(caller.can(&org_a, PermissionLevel::Viewer));
        assert!(!caller.can(&org_a, PermissionLevel::Admin));
        assert!(!caller.can(&org_b, PermissionLevel::Viewer));
    }

    #[test]
    fn test_highest_permission_wins() {
        let org = ObjectId::new();
        let caller = identity(vec![
            Role::new(org, PermissionLevel::Viewer),
            Role::new(org, PermissionLevel::Admin),
        ]);
        assert_eq!(caller.permission_in(&org), Some(PermissionLevel::Admin));
        assert_eq!(caller.org_ids(), vec![org]);
    }

    #[test]
    fn test_shares_org_with() {
        let shared = ObjectId::new();
        let caller = identity(vec![Role::new(shared, PermissionLevel::Viewer)]);

        assert!(caller.shares_org_with(&[Role::new(shared, PermissionLevel::Admin)]));
        assert!(!caller.shares_org_with(&[Role::new(ObjectId::new(), PermissionLevel::Admin)]));
        assert!(!caller.shares_org_with(&[]));
    }
}
