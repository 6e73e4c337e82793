//! Organization interactors

use async_graphql::InputObject;
use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::info;

use crate::auth::PermissionLevel;
use crate::context::RequestContext;
use crate::db::schemas::{ContactDoc, OrganizationDoc, TagDoc, UserDoc};
use crate::db::{parse_id, Collection, Entity};
use crate::dto::{
    contact_dto, organization_dto, tag_dto, user_dto, ContactDto, OrganizationDto, TagDto, UserDto,
};
use crate::interactors::{required_text, Interactor, Visibility};
use crate::refs::{resolve_all, REQUIRED, TAGS};
use crate::types::{CaseworkError, Result};

pub struct GetOrganization {
    organizations: Collection<OrganizationDoc>,
}

impl GetOrganization {
    pub fn new(organizations: Collection<OrganizationDoc>) -> Self {
        Self { organizations }
    }
}

#[async_trait]
impl Interactor for GetOrganization {
    type Parent = ();
    type Args = ObjectId;
    type Output = Option<OrganizationDto>;

    async fn handle(&self, _: &(), id: ObjectId, ctx: &RequestContext) -> Result<Self::Output> {
        let org = self.organizations.item_by_object_id(id).await?;
        Ok(Visibility::check(org, |_| ctx.in_org(&id))
            .into_option("get_organization")
            .map(organization_dto))
    }
}

/// Organizations the caller holds a role in
pub struct GetOrganizations {
    organizations: Collection<OrganizationDoc>,
}

impl GetOrganizations {
    pub fn new(organizations: Collection<OrganizationDoc>) -> Self {
        Self { organizations }
    }
}

#[async_trait]
impl Interactor for GetOrganizations {
    type Parent = ();
    type Args = ();
    type Output = Vec<OrganizationDto>;

    async fn handle(&self, _: &(), _: (), ctx: &RequestContext) -> Result<Self::Output> {
        let Some(identity) = ctx.identity() else {
            return Ok(Vec::new());
        };
        let orgs = self
            .organizations
            .organizations_by_ids(&identity.org_ids())
            .await?;
        Ok(orgs.into_iter().map(organization_dto).collect())
    }
}

pub struct OrganizationTags {
    tags: Collection<TagDoc>,
}

impl OrganizationTags {
    pub fn new(tags: Collection<TagDoc>) -> Self {
        Self { tags }
    }
}

#[async_trait]
impl Interactor for OrganizationTags {
    type Parent = OrganizationDto;
    type Args = ();
    type Output = Vec<TagDto>;

    async fn handle(&self, org: &OrganizationDto, _: (), _: &RequestContext) -> Result<Self::Output> {
        let tags = resolve_all(&self.tags, &org.tag_ids, TAGS).await?;
        Ok(tags.into_iter().map(tag_dto).collect())
    }
}

pub struct OrganizationContacts {
    contacts: Collection<ContactDoc>,
}

impl OrganizationContacts {
    pub fn new(contacts: Collection<ContactDoc>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl Interactor for OrganizationContacts {
    type Parent = OrganizationDto;
    type Args = ();
    type Output = Vec<ContactDto>;

    async fn handle(&self, org: &OrganizationDto, _: (), ctx: &RequestContext) -> Result<Self::Output> {
        if !ctx.in_org(&org.oid) {
            return Ok(Vec::new());
        }
        let contacts = resolve_all(&self.contacts, &org.contact_ids, REQUIRED).await?;
        Ok(contacts.into_iter().map(contact_dto).collect())
    }
}

pub struct OrganizationUsers {
    users: Collection<UserDoc>,
}

impl OrganizationUsers {
    pub fn new(users: Collection<UserDoc>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Interactor for OrganizationUsers {
    type Parent = OrganizationDto;
    type Args = ();
    type Output = Vec<UserDto>;

    async fn handle(&self, org: &OrganizationDto, _: (), ctx: &RequestContext) -> Result<Self::Output> {
        if !ctx.in_org(&org.oid) {
            return Ok(Vec::new());
        }
        let users = resolve_all(&self.users, &org.member_ids, REQUIRED).await?;
        Ok(users
            .into_iter()
            .map(|user| {
                let extended = ctx.sees_extended(&user);
                user_dto(user, extended)
            })
            .collect())
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateOrganizationInput {
    pub name: String,
}

/// Create an organization with the caller as its first administrator
pub struct CreateOrganization {
    organizations: Collection<OrganizationDoc>,
    users: Collection<UserDoc>,
}

impl CreateOrganization {
    pub fn new(organizations: Collection<OrganizationDoc>, users: Collection<UserDoc>) -> Self {
        Self {
            organizations,
            users,
        }
    }
}

#[async_trait]
impl Interactor for CreateOrganization {
    type Parent = ();
    type Args = CreateOrganizationInput;
    type Output = OrganizationDto;

    async fn handle(
        &self,
        _: &(),
        input: CreateOrganizationInput,
        ctx: &RequestContext,
    ) -> Result<Self::Output> {
        let identity = ctx.require_identity()?;
        let name = required_text("name", input.name)?;

        let mut org = OrganizationDoc::new(name);
        let org_id = ObjectId::new();
        org._id = Some(org_id);
        org.upsert_member(identity.user_id, PermissionLevel::Admin);
        let org = self.organizations.insert(org).await?;

        self.users
            .put_role(identity.user_id, org_id, PermissionLevel::Admin)
            .await?
            .ok_or_else(|| CaseworkError::missing(UserDoc::COLLECTION, identity.user_id))?;

        info!(org_id = %org_id, user_id = %identity.user_id, "organization created");
        Ok(organization_dto(org))
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct AddMemberInput {
    pub org_id: async_graphql::ID,
    pub user_id: async_graphql::ID,
    #[graphql(default)]
    pub permission: PermissionLevel,
}

/// Grant a user a role in an organization; administrators only
pub struct AddMember {
    organizations: Collection<OrganizationDoc>,
    users: Collection<UserDoc>,
}

impl AddMember {
    pub fn new(organizations: Collection<OrganizationDoc>, users: Collection<UserDoc>) -> Self {
        Self {
            organizations,
            users,
        }
    }
}

#[async_trait]
impl Interactor for AddMember {
    type Parent = ();
    type Args = AddMemberInput;
    type Output = Option<OrganizationDto>;

    async fn handle(&self, _: &(), input: AddMemberInput, ctx: &RequestContext) -> Result<Self::Output> {
        ctx.require_identity()?;
        let org_id = parse_id(&input.org_id)?;
        let user_id = parse_id(&input.user_id)?;

        let org = self.organizations.item_by_object_id(org_id).await?;
        if Visibility::check(org, |_| ctx.can(&org_id, PermissionLevel::Admin))
            .into_option("add_member")
            .is_none()
        {
            return Ok(None);
        }

        if Visibility::found(self.users.item_by_object_id(user_id).await?)
            .into_option("add_member.user")
            .is_none()
        {
            return Ok(None);
        }

        let Some(org) = self
            .organizations
            .put_member(org_id, user_id, input.permission)
            .await?
        else {
            return Ok(None);
        };
        self.users.put_role(user_id, org_id, input.permission).await?;

        info!(org_id = %org_id, user_id = %user_id, permission = %input.permission, "member added");
        Ok(Some(organization_dto(org)))
    }
}
