//! Query root

use async_graphql::{Context, Object, Result, ID};

use crate::db::{parse_id, Pagination};
use crate::db::schemas::EngagementStatus;
use crate::dto::{
    ContactDto, ContactPage, EngagementDto, EngagementPage, OrganizationDto, ServiceAnswerDto,
    ServiceDto, TagDto, UserDto,
};
use crate::graphql::{gql, wiring};
use crate::interactors::{EngagementQuery, Interactor};

#[derive(Default)]
pub struct QueryRoot;

fn window(offset: Option<i32>, limit: Option<i32>) -> Pagination {
    Pagination::new(
        offset.map(|o| u64::try_from(o).unwrap_or(0)),
        limit.map(i64::from),
    )
}

#[Object]
impl QueryRoot {
    async fn get_organization(&self, ctx: &Context<'_>, id: ID) -> Result<Option<OrganizationDto>> {
        let (i, rc) = wiring(ctx)?;
        let id = gql(parse_id(&id))?;
        gql(i.get_organization.handle(&(), id, rc).await)
    }

    /// Organizations the caller belongs to
    async fn get_organizations(&self, ctx: &Context<'_>) -> Result<Vec<OrganizationDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.get_organizations.handle(&(), (), rc).await)
    }

    async fn get_user(&self, ctx: &Context<'_>, id: ID) -> Result<Option<UserDto>> {
        let (i, rc) = wiring(ctx)?;
        let id = gql(parse_id(&id))?;
        gql(i.get_user.handle(&(), id, rc).await)
    }

    /// The authenticated caller, or null
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<UserDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.get_me.handle(&(), (), rc).await)
    }

    async fn get_contact(&self, ctx: &Context<'_>, id: ID) -> Result<Option<ContactDto>> {
        let (i, rc) = wiring(ctx)?;
        let id = gql(parse_id(&id))?;
        gql(i.get_contact.handle(&(), id, rc).await)
    }

    async fn get_contacts(
        &self,
        ctx: &Context<'_>,
        org_id: ID,
        offset: Option<i32>,
        limit: Option<i32>,
    ) -> Result<ContactPage> {
        let (i, rc) = wiring(ctx)?;
        let org_id = gql(parse_id(&org_id))?;
        gql(i.get_contacts.handle(&(), (org_id, window(offset, limit)), rc).await)
    }

    async fn get_engagement(&self, ctx: &Context<'_>, id: ID) -> Result<Option<EngagementDto>> {
        let (i, rc) = wiring(ctx)?;
        let id = gql(parse_id(&id))?;
        gql(i.get_engagement.handle(&(), id, rc).await)
    }

    async fn get_engagements(
        &self,
        ctx: &Context<'_>,
        org_id: ID,
        status: Option<EngagementStatus>,
        offset: Option<i32>,
        limit: Option<i32>,
    ) -> Result<EngagementPage> {
        let (i, rc) = wiring(ctx)?;
        let query = EngagementQuery {
            org_id: gql(parse_id(&org_id))?,
            status,
            window: window(offset, limit),
        };
        gql(i.get_engagements.handle(&(), query, rc).await)
    }

    async fn get_services(&self, ctx: &Context<'_>, org_id: ID) -> Result<Vec<ServiceDto>> {
        let (i, rc) = wiring(ctx)?;
        let org_id = gql(parse_id(&org_id))?;
        gql(i.get_services.handle(&(), org_id, rc).await)
    }

    async fn get_service(&self, ctx: &Context<'_>, id: ID) -> Result<Option<ServiceDto>> {
        let (i, rc) = wiring(ctx)?;
        let id = gql(parse_id(&id))?;
        gql(i.get_service.handle(&(), id, rc).await)
    }

    async fn get_service_answers(
        &self,
        ctx: &Context<'_>,
        service_id: ID,
    ) -> Result<Vec<ServiceAnswerDto>> {
        let (i, rc) = wiring(ctx)?;
        let service_id = gql(parse_id(&service_id))?;
        gql(i.get_service_answers.handle(&(), service_id, rc).await)
    }

    async fn get_tags(&self, ctx: &Context<'_>, category: Option<String>) -> Result<Vec<TagDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.get_tags.handle(&(), category, rc).await)
    }

    /// Service answers recorded against the org's services carrying the tag
    async fn service_entry_tag_count(
        &self,
        ctx: &Context<'_>,
        org_id: ID,
        tag_id: ID,
    ) -> Result<Option<u64>> {
        let (i, rc) = wiring(ctx)?;
        let key = (gql(parse_id(&org_id))?, gql(parse_id(&tag_id))?);
        gql(i.service_entry_tag_counter.handle(&(), key, rc).await)
    }

    /// The org's engagements carrying the tag
    async fn engagement_tag_count(
        &self,
        ctx: &Context<'_>,
        org_id: ID,
        tag_id: ID,
    ) -> Result<Option<u64>> {
        let (i, rc) = wiring(ctx)?;
        let key = (gql(parse_id(&org_id))?, gql(parse_id(&tag_id))?);
        gql(i.engagement_tag_counter.handle(&(), key, rc).await)
    }
}
