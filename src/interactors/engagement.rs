//! Engagement interactors
//!
//! Creating or updating an engagement publishes the new state on the
//! organization's engagement channel.

use async_graphql::{InputObject, ID};
use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::auth::PermissionLevel;
use crate::context::RequestContext;
use crate::db::schemas::{ContactDoc, EngagementDoc, EngagementStatus, TagDoc, UserDoc};
use crate::db::{parse_id, Collection, Pagination, Update};
use crate::dto::{
    contact_dto, engagement_dto, tag_dto, user_dto, ContactDto, EngagementDto, EngagementPage,
    TagDto, UserDto,
};
use crate::interactors::{parse_ids, required_text, Interactor, Visibility};
use crate::publisher::Publisher;
use crate::refs::{resolve_all, resolve_optional, REQUIRED, TAGS};
use crate::types::{CaseworkError, Result};

pub struct GetEngagement {
    engagements: Collection<EngagementDoc>,
}

impl GetEngagement {
    pub fn new(engagements: Collection<EngagementDoc>) -> Self {
        Self { engagements }
    }
}

#[async_trait]
impl Interactor for GetEngagement {
    type Parent = ();
    type Args = ObjectId;
    type Output = Option<EngagementDto>;

    async fn handle(&self, _: &(), id: ObjectId, ctx: &RequestContext) -> Result<Self::Output> {
        let engagement = self.engagements.item_by_object_id(id).await?;
        Ok(Visibility::check(engagement, |e| ctx.in_org(&e.org_id))
            .into_option("get_engagement")
            .map(engagement_dto))
    }
}

#[derive(Debug, Clone)]
pub struct EngagementQuery {
    pub org_id: ObjectId,
    pub status: Option<EngagementStatus>,
    pub window: Pagination,
}

pub struct GetEngagements {
    engagements: Collection<EngagementDoc>,
}

impl GetEngagements {
    pub fn new(engagements: Collection<EngagementDoc>) -> Self {
        Self { engagements }
    }
}

#[async_trait]
impl Interactor for GetEngagements {
    type Parent = ();
    type Args = EngagementQuery;
    type Output = EngagementPage;

    async fn handle(&self, _: &(), query: EngagementQuery, ctx: &RequestContext) -> Result<Self::Output> {
        if Visibility::org(ctx, &query.org_id)
            .into_option("get_engagements")
            .is_none()
        {
            return Ok(EngagementPage::empty());
        }
        let page = self
            .engagements
            .engagements_for_org(query.org_id, query.status, query.window)
            .await?;
        Ok(page.into())
    }
}

/// The assigned case worker; unassigned engagements resolve to `None`
pub struct EngagementUser {
    users: Collection<UserDoc>,
}

impl EngagementUser {
    pub fn new(users: Collection<UserDoc>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Interactor for EngagementUser {
    type Parent = EngagementDto;
    type Args = ();
    type Output = Option<UserDto>;

    async fn handle(&self, engagement: &EngagementDto, _: (), ctx: &RequestContext) -> Result<Self::Output> {
        let user = resolve_optional(&self.users, engagement.user_id).await?;
        Ok(user.map(|user| {
            let extended = ctx.sees_extended(&user);
            user_dto(user, extended)
        }))
    }
}

pub struct EngagementContacts {
    contacts: Collection<ContactDoc>,
}

impl EngagementContacts {
    pub fn new(contacts: Collection<ContactDoc>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl Interactor for EngagementContacts {
    type Parent = EngagementDto;
    type Args = ();
    type Output = Vec<ContactDto>;

    async fn handle(&self, engagement: &EngagementDto, _: (), ctx: &RequestContext) -> Result<Self::Output> {
        if !ctx.in_org(&engagement.org_oid) {
            return Ok(Vec::new());
        }
        let contacts = resolve_all(&self.contacts, &engagement.contact_ids, REQUIRED).await?;
        Ok(contacts.into_iter().map(contact_dto).collect())
    }
}

pub struct EngagementTags {
    tags: Collection<TagDoc>,
}

impl EngagementTags {
    pub fn new(tags: Collection<TagDoc>) -> Self {
        Self { tags }
    }
}

#[async_trait]
impl Interactor for EngagementTags {
    type Parent = EngagementDto;
    type Args = ();
    type Output = Vec<TagDto>;

    async fn handle(&self, engagement: &EngagementDto, _: (), _: &RequestContext) -> Result<Self::Output> {
        let tags = resolve_all(&self.tags, &engagement.tag_ids, TAGS).await?;
        Ok(tags.into_iter().map(tag_dto).collect())
    }
}

// ============================================================================
// Mutations
// ============================================================================

#[derive(InputObject, Debug, Clone)]
pub struct CreateEngagementInput {
    pub org_id: ID,
    pub title: String,
    #[graphql(default)]
    pub description: String,
    pub status: Option<EngagementStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub user_id: Option<ID>,
    #[graphql(default)]
    pub contact_ids: Vec<ID>,
    #[graphql(default)]
    pub tag_ids: Vec<ID>,
}

#[derive(InputObject, Debug, Clone)]
pub struct UpdateEngagementInput {
    pub id: ID,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<EngagementStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub user_id: Option<ID>,
    pub contact_ids: Option<Vec<ID>>,
    pub tag_ids: Option<Vec<ID>>,
}

/// Storage handles shared by the engagement write paths
#[derive(Clone)]
struct EngagementWriter {
    engagements: Collection<EngagementDoc>,
    contacts: Collection<ContactDoc>,
    users: Collection<UserDoc>,
    publisher: Publisher,
}

impl EngagementWriter {
    /// Every contact must exist and belong to the organization
    async fn check_contacts(&self, org_id: ObjectId, ids: &[ObjectId]) -> Result<()> {
        let found = self.contacts.items_by_ids(ids).await?;
        for id in ids {
            let belongs = found
                .iter()
                .any(|c| c._id == Some(*id) && c.org_id == org_id);
            if !belongs {
                return Err(CaseworkError::BadRequest(format!(
                    "Contact {} is not in this organization",
                    id
                )));
            }
        }
        Ok(())
    }

    /// The assignee must exist and hold a role in the organization
    async fn check_assignee(&self, org_id: ObjectId, user_id: ObjectId) -> Result<()> {
        match self.users.member_of_org(user_id, org_id).await? {
            Some(_) => Ok(()),
            None => Err(CaseworkError::BadRequest(format!(
                "User {} is not a member of this organization",
                user_id
            ))),
        }
    }

    /// Keep each contact's engagement list in step with the engagement
    async fn sync_contacts(&self, engagement_id: ObjectId, before: &[ObjectId], after: &[ObjectId]) -> Result<()> {
        for contact_id in after {
            self.contacts.link_engagement(*contact_id, engagement_id).await?;
        }
        for contact_id in before.iter().filter(|id| !after.contains(id)) {
            self.contacts.unlink_engagement(*contact_id, engagement_id).await?;
        }
        Ok(())
    }

    fn publish(&self, engagement: &EngagementDoc) {
        self.publisher.publish_engagement(engagement.clone());
    }
}

fn check_dates(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(CaseworkError::BadRequest(
            "end_date must not be before start_date".into(),
        )),
        _ => Ok(()),
    }
}

fn to_bson_date(date: Option<DateTime<Utc>>) -> Option<bson::DateTime> {
    date.map(bson::DateTime::from_chrono)
}

pub struct CreateEngagement {
    writer: EngagementWriter,
}

impl CreateEngagement {
    pub fn new(
        engagements: Collection<EngagementDoc>,
        contacts: Collection<ContactDoc>,
        users: Collection<UserDoc>,
        publisher: Publisher,
    ) -> Self {
        Self {
            writer: EngagementWriter {
                engagements,
                contacts,
                users,
                publisher,
            },
        }
    }
}

#[async_trait]
impl Interactor for CreateEngagement {
    type Parent = ();
    type Args = CreateEngagementInput;
    type Output = Option<EngagementDto>;

    async fn handle(&self, _: &(), input: CreateEngagementInput, ctx: &RequestContext) -> Result<Self::Output> {
        ctx.require_identity()?;
        let org_id = parse_id(&input.org_id)?;
        if Visibility::permit(ctx.can(&org_id, PermissionLevel::Member))
            .into_option("create_engagement")
            .is_none()
        {
            return Ok(None);
        }

        check_dates(input.start_date, input.end_date)?;
        let contact_ids = parse_ids(&input.contact_ids)?;
        self.writer.check_contacts(org_id, &contact_ids).await?;

        let user_id = input.user_id.as_deref().map(|id| parse_id(id)).transpose()?;
        if let Some(user_id) = user_id {
            self.writer.check_assignee(org_id, user_id).await?;
        }

        let mut engagement = EngagementDoc::new(org_id, required_text("title", input.title)?);
        engagement.description = input.description;
        engagement.status = input.status.unwrap_or(if user_id.is_some() {
            EngagementStatus::Assigned
        } else {
            EngagementStatus::Open
        });
        engagement.start_date = to_bson_date(input.start_date);
        engagement.end_date = to_bson_date(input.end_date);
        engagement.user_id = user_id;
        engagement.contacts = contact_ids.clone();
        engagement.tags = parse_ids(&input.tag_ids)?;

        let engagement = self.writer.engagements.insert(engagement).await?;
        let engagement_id = engagement._id.unwrap_or_default();
        self.writer.sync_contacts(engagement_id, &[], &contact_ids).await?;

        info!(org_id = %org_id, engagement_id = %engagement_id, "engagement created");
        self.writer.publish(&engagement);
        Ok(Some(engagement_dto(engagement)))
    }
}

pub struct UpdateEngagement {
    writer: EngagementWriter,
}

impl UpdateEngagement {
    pub fn new(
        engagements: Collection<EngagementDoc>,
        contacts: Collection<ContactDoc>,
        users: Collection<UserDoc>,
        publisher: Publisher,
    ) -> Self {
        Self {
            writer: EngagementWriter {
                engagements,
                contacts,
                users,
                publisher,
            },
        }
    }
}

#[async_trait]
impl Interactor for UpdateEngagement {
    type Parent = ();
    type Args = UpdateEngagementInput;
    type Output = Option<EngagementDto>;

    async fn handle(&self, _: &(), input: UpdateEngagementInput, ctx: &RequestContext) -> Result<Self::Output> {
        ctx.require_identity()?;
        let id = parse_id(&input.id)?;

        let current = self.writer.engagements.item_by_object_id(id).await?;
        let Some(current) =
            Visibility::check(current, |e| ctx.can(&e.org_id, PermissionLevel::Member))
                .into_option("update_engagement")
        else {
            return Ok(None);
        };
        let org_id = current.org_id;

        let mut update = Update::new();
        if let Some(title) = input.title {
            update = update.set("title", required_text("title", title)?);
        }
        if let Some(description) = input.description {
            update = update.set("description", description);
        }

        let start_date = match input.start_date {
            Some(_) => to_bson_date(input.start_date),
            None => current.start_date,
        };
        let end_date = match input.end_date {
            Some(_) => to_bson_date(input.end_date),
            None => current.end_date,
        };
        check_dates(
            start_date.map(|d| d.to_chrono()),
            end_date.map(|d| d.to_chrono()),
        )?;
        if input.start_date.is_some() {
            update = update.set("start_date", start_date);
        }
        if input.end_date.is_some() {
            update = update.set("end_date", end_date);
        }

        let mut status = input.status;
        if let Some(user_id) = input.user_id {
            let user_id = parse_id(&user_id)?;
            self.writer.check_assignee(org_id, user_id).await?;
            if status.unwrap_or(current.status) == EngagementStatus::Open {
                status = Some(EngagementStatus::Assigned);
            }
            update = update.set("user_id", user_id);
        }
        if let Some(status) = status {
            update = update.set("status", status.as_str());
        }
        if let Some(tag_ids) = input.tag_ids {
            update = update.set("tags", parse_ids(&tag_ids)?);
        }

        let mut relinked = None;
        if let Some(contact_ids) = input.contact_ids {
            let contact_ids = parse_ids(&contact_ids)?;
            self.writer.check_contacts(org_id, &contact_ids).await?;
            update = update.set("contacts", contact_ids.clone());
            relinked = Some(contact_ids);
        }

        let Some(engagement) = self.writer.engagements.update(id, update).await? else {
            return Ok(None);
        };
        if let Some(contact_ids) = relinked {
            self.writer.sync_contacts(id, &current.contacts, &contact_ids).await?;
        }

        info!(org_id = %org_id, engagement_id = %id, "engagement updated");
        self.writer.publish(&engagement);
        Ok(Some(engagement_dto(engagement)))
    }
}
