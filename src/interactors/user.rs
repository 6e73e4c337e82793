//! User interactors

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::context::RequestContext;
use crate::db::schemas::UserDoc;
use crate::db::Collection;
use crate::dto::{user_dto, UserDto};
use crate::interactors::{Interactor, Visibility};
use crate::types::Result;

/// Any user by id, projected according to the caller's relationship
///
/// The caller sees the extended projection of themselves and of anyone they
/// share an organization with, and the redacted projection otherwise.
pub struct GetUser {
    users: Collection<UserDoc>,
}

impl GetUser {
    pub fn new(users: Collection<UserDoc>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Interactor for GetUser {
    type Parent = ();
    type Args = ObjectId;
    type Output = Option<UserDto>;

    async fn handle(&self, _: &(), id: ObjectId, ctx: &RequestContext) -> Result<Self::Output> {
        let user = self.users.item_by_object_id(id).await?;
        Ok(Visibility::found(user)
            .into_option("get_user")
            .map(|user| {
                let extended = ctx.sees_extended(&user);
                user_dto(user, extended)
            }))
    }
}

/// The authenticated caller
pub struct GetMe {
    users: Collection<UserDoc>,
}

impl GetMe {
    pub fn new(users: Collection<UserDoc>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Interactor for GetMe {
    type Parent = ();
    type Args = ();
    type Output = Option<UserDto>;

    async fn handle(&self, _: &(), _: (), ctx: &RequestContext) -> Result<Self::Output> {
        let Some(identity) = ctx.identity() else {
            return Ok(None);
        };
        let user = self.users.item_by_object_id(identity.user_id).await?;
        Ok(Visibility::found(user)
            .into_option("get_me")
            .map(|user| user_dto(user, true)))
    }
}
