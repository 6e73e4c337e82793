//! Mutation root
//!
//! Mutations need an authenticated caller. A mutation aimed at an
//! organization the caller has no suitable role in resolves to null.

use async_graphql::{Context, Object, Result};

use crate::dto::{ContactDto, EngagementDto, MentionDto, OrganizationDto, ServiceAnswerDto, ServiceDto, TagDto};
use crate::graphql::{gql, wiring};
use crate::interactors::{
    AddMemberInput, CreateContactInput, CreateEngagementInput, CreateMentionInput,
    CreateOrganizationInput, CreateServiceAnswerInput, CreateServiceInput, CreateTagInput,
    Interactor, UpdateContactInput, UpdateEngagementInput,
};

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create an organization administered by the caller
    async fn create_organization(
        &self,
        ctx: &Context<'_>,
        input: CreateOrganizationInput,
    ) -> Result<OrganizationDto> {
        let (i, rc) = wiring(ctx)?;
        gql(i.create_organization.handle(&(), input, rc).await)
    }

    async fn add_member(&self, ctx: &Context<'_>, input: AddMemberInput) -> Result<Option<OrganizationDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.add_member.handle(&(), input, rc).await)
    }

    async fn create_contact(&self, ctx: &Context<'_>, input: CreateContactInput) -> Result<Option<ContactDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.create_contact.handle(&(), input, rc).await)
    }

    async fn update_contact(&self, ctx: &Context<'_>, input: UpdateContactInput) -> Result<Option<ContactDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.update_contact.handle(&(), input, rc).await)
    }

    async fn create_engagement(
        &self,
        ctx: &Context<'_>,
        input: CreateEngagementInput,
    ) -> Result<Option<EngagementDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.create_engagement.handle(&(), input, rc).await)
    }

    async fn update_engagement(
        &self,
        ctx: &Context<'_>,
        input: UpdateEngagementInput,
    ) -> Result<Option<EngagementDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.update_engagement.handle(&(), input, rc).await)
    }

    async fn create_service(&self, ctx: &Context<'_>, input: CreateServiceInput) -> Result<Option<ServiceDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.create_service.handle(&(), input, rc).await)
    }

    async fn create_service_answer(
        &self,
        ctx: &Context<'_>,
        input: CreateServiceAnswerInput,
    ) -> Result<Option<ServiceAnswerDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.create_service_answer.handle(&(), input, rc).await)
    }

    async fn create_tag(&self, ctx: &Context<'_>, input: CreateTagInput) -> Result<Option<TagDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.create_tag.handle(&(), input, rc).await)
    }

    async fn create_mention(&self, ctx: &Context<'_>, input: CreateMentionInput) -> Result<Option<MentionDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.create_mention.handle(&(), input, rc).await)
    }
}
