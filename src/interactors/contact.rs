//! Contact interactors

use async_graphql::{InputObject, ID};
use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::info;

use crate::auth::PermissionLevel;
use crate::context::RequestContext;
use crate::db::schemas::{ContactDoc, EngagementDoc, OrganizationDoc, TagDoc};
use crate::db::{parse_id, Collection, Pagination, Update};
use crate::dto::{contact_dto, engagement_dto, tag_dto, ContactDto, ContactPage, EngagementDto, TagDto};
use crate::interactors::{parse_ids, required_text, Interactor, Visibility};
use crate::refs::{resolve_all, REQUIRED, TAGS};
use crate::types::Result;

pub struct GetContact {
    contacts: Collection<ContactDoc>,
}

impl GetContact {
    pub fn new(contacts: Collection<ContactDoc>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl Interactor for GetContact {
    type Parent = ();
    type Args = ObjectId;
    type Output = Option<ContactDto>;

    async fn handle(&self, _: &(), id: ObjectId, ctx: &RequestContext) -> Result<Self::Output> {
        let contact = self.contacts.item_by_object_id(id).await?;
        Ok(Visibility::check(contact, |c| ctx.in_org(&c.org_id))
            .into_option("get_contact")
            .map(contact_dto))
    }
}

pub struct GetContacts {
    contacts: Collection<ContactDoc>,
}

impl GetContacts {
    pub fn new(contacts: Collection<ContactDoc>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl Interactor for GetContacts {
    type Parent = ();
    type Args = (ObjectId, Pagination);
    type Output = ContactPage;

    async fn handle(
        &self,
        _: &(),
        (org_id, window): (ObjectId, Pagination),
        ctx: &RequestContext,
    ) -> Result<Self::Output> {
        if Visibility::org(ctx, &org_id).into_option("get_contacts").is_none() {
            return Ok(ContactPage::empty());
        }
        Ok(self.contacts.contacts_for_org(org_id, window).await?.into())
    }
}

pub struct ContactTags {
    tags: Collection<TagDoc>,
}

impl ContactTags {
    pub fn new(tags: Collection<TagDoc>) -> Self {
        Self { tags }
    }
}

#[async_trait]
impl Interactor for ContactTags {
    type Parent = ContactDto;
    type Args = ();
    type Output = Vec<TagDto>;

    async fn handle(&self, contact: &ContactDto, _: (), _: &RequestContext) -> Result<Self::Output> {
        let tags = resolve_all(&self.tags, &contact.tag_ids, TAGS).await?;
        Ok(tags.into_iter().map(tag_dto).collect())
    }
}

pub struct ContactEngagements {
    engagements: Collection<EngagementDoc>,
}

impl ContactEngagements {
    pub fn new(engagements: Collection<EngagementDoc>) -> Self {
        Self { engagements }
    }
}

#[async_trait]
impl Interactor for ContactEngagements {
    type Parent = ContactDto;
    type Args = ();
    type Output = Vec<EngagementDto>;

    async fn handle(&self, contact: &ContactDto, _: (), ctx: &RequestContext) -> Result<Self::Output> {
        if !ctx.in_org(&contact.org_oid) {
            return Ok(Vec::new());
        }
        let engagements = resolve_all(&self.engagements, &contact.engagement_ids, REQUIRED).await?;
        Ok(engagements.into_iter().map(engagement_dto).collect())
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateContactInput {
    pub org_id: ID,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[graphql(default)]
    pub tag_ids: Vec<ID>,
}

/// Create a contact and record it on its organization
pub struct CreateContact {
    contacts: Collection<ContactDoc>,
    organizations: Collection<OrganizationDoc>,
}

impl CreateContact {
    pub fn new(contacts: Collection<ContactDoc>, organizations: Collection<OrganizationDoc>) -> Self {
        Self {
            contacts,
            organizations,
        }
    }
}

#[async_trait]
impl Interactor for CreateContact {
    type Parent = ();
    type Args = CreateContactInput;
    type Output = Option<ContactDto>;

    async fn handle(&self, _: &(), input: CreateContactInput, ctx: &RequestContext) -> Result<Self::Output> {
        ctx.require_identity()?;
        let org_id = parse_id(&input.org_id)?;

        let org = self.organizations.item_by_object_id(org_id).await?;
        if Visibility::check(org, |_| ctx.can(&org_id, PermissionLevel::Member))
            .into_option("create_contact")
            .is_none()
        {
            return Ok(None);
        }

        let mut contact = ContactDoc::new(org_id, required_text("name", input.name)?);
        contact.email = input.email;
        contact.phone = input.phone;
        contact.tags = parse_ids(&input.tag_ids)?;
        let contact = self.contacts.insert(contact).await?;

        if let Some(contact_id) = contact._id {
            self.organizations.add_contact(org_id, contact_id).await?;
            info!(org_id = %org_id, contact_id = %contact_id, "contact created");
        }
        Ok(Some(contact_dto(contact)))
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct UpdateContactInput {
    pub id: ID,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tag_ids: Option<Vec<ID>>,
}

pub struct UpdateContact {
    contacts: Collection<ContactDoc>,
}

impl UpdateContact {
    pub fn new(contacts: Collection<ContactDoc>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl Interactor for UpdateContact {
    type Parent = ();
    type Args = UpdateContactInput;
    type Output = Option<ContactDto>;

    async fn handle(&self, _: &(), input: UpdateContactInput, ctx: &RequestContext) -> Result<Self::Output> {
        ctx.require_identity()?;
        let id = parse_id(&input.id)?;

        let contact = self.contacts.item_by_object_id(id).await?;
        if Visibility::check(contact, |c| ctx.can(&c.org_id, PermissionLevel::Member))
            .into_option("update_contact")
            .is_none()
        {
            return Ok(None);
        }

        let mut update = Update::new();
        if let Some(name) = input.name {
            update = update.set("name", required_text("name", name)?);
        }
        if let Some(email) = input.email {
            update = update.set("email", email);
        }
        if let Some(phone) = input.phone {
            update = update.set("phone", phone);
        }
        if let Some(tag_ids) = input.tag_ids {
            update = update.set("tags", parse_ids(&tag_ids)?);
        }

        let contact = self.contacts.update(id, update).await?;
        Ok(contact.map(contact_dto))
    }
}
