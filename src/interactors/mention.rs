//! Mention interactors
//!
//! A mention points a colleague at an engagement. It is delivered live to
//! the tagged user's channel and not stored.

use async_graphql::{InputObject, ID};
use async_trait::async_trait;
use tracing::info;

use crate::context::RequestContext;
use crate::db::schemas::{EngagementDoc, Mention, UserDoc};
use crate::db::{parse_id, Collection};
use crate::dto::{engagement_dto, mention_dto, user_dto, EngagementDto, MentionDto, UserDto};
use crate::interactors::{Interactor, Visibility};
use crate::publisher::Publisher;
use crate::refs::{resolve_optional, Ref};
use crate::types::{CaseworkError, Result};

#[derive(InputObject, Debug, Clone)]
pub struct CreateMentionInput {
    pub engagement_id: ID,
    pub tagged_user_id: Option<ID>,
}

pub struct CreateMention {
    engagements: Collection<EngagementDoc>,
    users: Collection<UserDoc>,
    publisher: Publisher,
}

impl CreateMention {
    pub fn new(engagements: Collection<EngagementDoc>, users: Collection<UserDoc>, publisher: Publisher) -> Self {
        Self {
            engagements,
            users,
            publisher,
        }
    }
}

#[async_trait]
impl Interactor for CreateMention {
    type Parent = ();
    type Args = CreateMentionInput;
    type Output = Option<MentionDto>;

    async fn handle(&self, _: &(), input: CreateMentionInput, ctx: &RequestContext) -> Result<Self::Output> {
        let identity = ctx.require_identity()?;
        let engagement_id = parse_id(&input.engagement_id)?;

        let engagement = self.engagements.item_by_object_id(engagement_id).await?;
        let Some(engagement) = Visibility::check(engagement, |e| ctx.in_org(&e.org_id))
            .into_option("create_mention")
        else {
            return Ok(None);
        };

        let tagged_user = match input.tagged_user_id {
            None => None,
            Some(id) => {
                let user_id = parse_id(&id)?;
                let member = self.users.member_of_org(user_id, engagement.org_id).await?;
                if member.is_none() {
                    return Err(CaseworkError::BadRequest(format!(
                        "User {} is not a member of this organization",
                        user_id
                    )));
                }
                Some(user_id)
            }
        };

        let mention = Mention::new(engagement_id, identity.user_id, tagged_user);
        if let Some(user_id) = tagged_user {
            let delivered = self.publisher.publish_mention(&user_id, mention.clone());
            info!(engagement_id = %engagement_id, tagged_user = %user_id, delivered, "mention sent");
        }
        Ok(Some(mention_dto(mention)))
    }
}

/// The mentioned engagement, if the caller can still see it
pub struct MentionEngagement {
    engagements: Collection<EngagementDoc>,
}

impl MentionEngagement {
    pub fn new(engagements: Collection<EngagementDoc>) -> Self {
        Self { engagements }
    }
}

#[async_trait]
impl Interactor for MentionEngagement {
    type Parent = MentionDto;
    type Args = ();
    type Output = Option<EngagementDto>;

    async fn handle(&self, mention: &MentionDto, _: (), ctx: &RequestContext) -> Result<Self::Output> {
        let engagement = Ref::Unresolved(mention.engagement_id)
            .resolve(&self.engagements)
            .await?;
        Ok(Visibility::check(Some(engagement), |e| ctx.in_org(&e.org_id))
            .into_option("mention.engagement")
            .map(engagement_dto))
    }
}

pub struct MentionCreatedBy {
    users: Collection<UserDoc>,
}

impl MentionCreatedBy {
    pub fn new(users: Collection<UserDoc>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Interactor for MentionCreatedBy {
    type Parent = MentionDto;
    type Args = ();
    type Output = UserDto;

    async fn handle(&self, mention: &MentionDto, _: (), ctx: &RequestContext) -> Result<Self::Output> {
        let user = Ref::Unresolved(mention.created_by).resolve(&self.users).await?;
        let extended = ctx.sees_extended(&user);
        Ok(user_dto(user, extended))
    }
}

/// The mention target; mentions without one resolve to `None`
pub struct MentionTaggedUser {
    users: Collection<UserDoc>,
}

impl MentionTaggedUser {
    pub fn new(users: Collection<UserDoc>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Interactor for MentionTaggedUser {
    type Parent = MentionDto;
    type Args = ();
    type Output = Option<UserDto>;

    async fn handle(&self, mention: &MentionDto, _: (), ctx: &RequestContext) -> Result<Self::Output> {
        let user = resolve_optional(&self.users, mention.tagged_user).await?;
        Ok(user.map(|user| {
            let extended = ctx.sees_extended(&user);
            user_dto(user, extended)
        }))
    }
}
