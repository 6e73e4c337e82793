//! Nested fields of the object types
//!
//! Fields backed by required references are nullable: a missing reference
//! fails that field alone and leaves its siblings intact.

use async_graphql::{ComplexObject, Context, Result};

use crate::dto::{
    ContactDto, EngagementDto, MentionDto, OrganizationDto, ServiceAnswerDto, ServiceDto, TagDto,
    UserDto,
};
use crate::graphql::{gql, wiring};
use crate::interactors::Interactor;

#[ComplexObject]
impl OrganizationDto {
    async fn tags(&self, ctx: &Context<'_>) -> Result<Vec<TagDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.organization_tags.handle(self, (), rc).await)
    }

    async fn contacts(&self, ctx: &Context<'_>) -> Result<Option<Vec<ContactDto>>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.organization_contacts.handle(self, (), rc).await).map(Some)
    }

    async fn users(&self, ctx: &Context<'_>) -> Result<Option<Vec<UserDto>>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.organization_users.handle(self, (), rc).await).map(Some)
    }
}

#[ComplexObject]
impl ContactDto {
    async fn tags(&self, ctx: &Context<'_>) -> Result<Vec<TagDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.contact_tags.handle(self, (), rc).await)
    }

    async fn engagements(&self, ctx: &Context<'_>) -> Result<Option<Vec<EngagementDto>>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.contact_engagements.handle(self, (), rc).await).map(Some)
    }
}

#[ComplexObject]
impl EngagementDto {
    /// Assigned case worker
    async fn user(&self, ctx: &Context<'_>) -> Result<Option<UserDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.engagement_user.handle(self, (), rc).await)
    }

    async fn contacts(&self, ctx: &Context<'_>) -> Result<Option<Vec<ContactDto>>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.engagement_contacts.handle(self, (), rc).await).map(Some)
    }

    async fn tags(&self, ctx: &Context<'_>) -> Result<Vec<TagDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.engagement_tags.handle(self, (), rc).await)
    }
}

#[ComplexObject]
impl ServiceDto {
    async fn tags(&self, ctx: &Context<'_>) -> Result<Vec<TagDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.service_tags.handle(self, (), rc).await)
    }

    async fn answer_count(&self, ctx: &Context<'_>) -> Result<u64> {
        let (i, rc) = wiring(ctx)?;
        gql(i.service_answer_count.handle(self, (), rc).await)
    }
}

#[ComplexObject]
impl ServiceAnswerDto {
    async fn contacts(&self, ctx: &Context<'_>) -> Result<Option<Vec<ContactDto>>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.service_answer_contacts.handle(self, (), rc).await).map(Some)
    }
}

#[ComplexObject]
impl MentionDto {
    async fn engagement(&self, ctx: &Context<'_>) -> Result<Option<EngagementDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.mention_engagement.handle(self, (), rc).await)
    }

    async fn created_by(&self, ctx: &Context<'_>) -> Result<Option<UserDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.mention_created_by.handle(self, (), rc).await).map(Some)
    }

    async fn tagged_user(&self, ctx: &Context<'_>) -> Result<Option<UserDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.mention_tagged_user.handle(self, (), rc).await)
    }
}
