//! Per-request context
//!
//! The [`ContextProvider`] turns a bearer token into a [`RequestContext`]:
//! the token is verified, the user is reloaded so roles are current, and the
//! token version is checked against the stored one.

use bson::oid::ObjectId;
use tracing::debug;
use uuid::Uuid;

use crate::auth::{extract_token_from_header, Identity, JwtValidator, PermissionLevel};
use crate::db::schemas::UserDoc;
use crate::db::{parse_id, Collection};
use crate::types::{CaseworkError, Result};

/// Identity and correlation data for one request or subscription
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub identity: Option<Identity>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            identity: None,
        }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            identity: Some(identity),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The caller, or `Unauthorized` when anonymous
    pub fn require_identity(&self) -> Result<&Identity> {
        self.identity
            .as_ref()
            .ok_or_else(|| CaseworkError::Unauthorized("Authentication required".into()))
    }

    /// Whether the caller holds any role in the organization
    pub fn in_org(&self, org_id: &ObjectId) -> bool {
        self.identity.as_ref().is_some_and(|i| i.has_role_in(org_id))
    }

    /// Whether the caller holds at least `level` in the organization
    pub fn can(&self, org_id: &ObjectId, level: PermissionLevel) -> bool {
        self.identity.as_ref().is_some_and(|i| i.can(org_id, level))
    }

    /// Whether the caller may see the extended projection of `user`
    pub fn sees_extended(&self, user: &UserDoc) -> bool {
        match &self.identity {
            None => false,
            Some(identity) => {
                user._id == Some(identity.user_id) || identity.shares_org_with(&user.roles)
            }
        }
    }
}

/// Builds request contexts from bearer tokens
#[derive(Clone)]
pub struct ContextProvider {
    jwt: JwtValidator,
    users: Collection<UserDoc>,
}

impl ContextProvider {
    pub fn new(jwt: JwtValidator, users: Collection<UserDoc>) -> Self {
        Self { jwt, users }
    }

    pub fn jwt(&self) -> &JwtValidator {
        &self.jwt
    }

    /// Context for an `Authorization` header value
    pub async fn from_header(&self, header: Option<&str>) -> Result<RequestContext> {
        self.from_token(extract_token_from_header(header)).await
    }

    /// Context for a raw token; no token means an anonymous caller
    pub async fn from_token(&self, token: Option<&str>) -> Result<RequestContext> {
        let Some(token) = token else {
            return Ok(RequestContext::anonymous());
        };

        let claims = self.jwt.verify_token(token).into_claims()?;
        let user_id = parse_id(&claims.sub)
            .map_err(|_| CaseworkError::Unauthorized("Malformed token subject".into()))?;

        let user = self
            .users
            .item_by_object_id(user_id)
            .await?
            .ok_or_else(|| CaseworkError::Unauthorized("Unknown user".into()))?;

        if user.token_version != claims.version {
            debug!(user_id = %user_id, "rejected token with stale version");
            return Err(CaseworkError::Unauthorized("Token has been revoked".into()));
        }

        Ok(RequestContext::authenticated(Identity {
            user_id,
            username: user.username,
            roles: user.roles,
        }))
    }
}
