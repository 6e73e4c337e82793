//! Tag interactors

use async_graphql::{InputObject, ID};
use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::info;

use crate::auth::PermissionLevel;
use crate::context::RequestContext;
use crate::db::schemas::{OrganizationDoc, TagDoc};
use crate::db::{parse_id, Collection};
use crate::dto::{tag_dto, TagDto};
use crate::interactors::{required_text, Interactor, Visibility};
use crate::types::Result;

/// Tags used by the caller's organizations, optionally one category only
pub struct GetTags {
    organizations: Collection<OrganizationDoc>,
    tags: Collection<TagDoc>,
}

impl GetTags {
    pub fn new(organizations: Collection<OrganizationDoc>, tags: Collection<TagDoc>) -> Self {
        Self {
            organizations,
            tags,
        }
    }
}

#[async_trait]
impl Interactor for GetTags {
    type Parent = ();
    type Args = Option<String>;
    type Output = Vec<TagDto>;

    async fn handle(&self, _: &(), category: Option<String>, ctx: &RequestContext) -> Result<Self::Output> {
        let Some(identity) = ctx.identity() else {
            return Ok(Vec::new());
        };

        let orgs = self
            .organizations
            .organizations_by_ids(&identity.org_ids())
            .await?;
        let mut tag_ids = Vec::new();
        for tag_id in orgs.into_iter().flat_map(|o| o.tags) {
            if !tag_ids.contains(&tag_id) {
                tag_ids.push(tag_id);
            }
        }

        let tags = self
            .tags
            .tags_in_category(&tag_ids, category.as_deref())
            .await?;
        Ok(tags.into_iter().map(tag_dto).collect())
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateTagInput {
    pub org_id: ID,
    pub label: String,
    #[graphql(default)]
    pub description: String,
    #[graphql(default)]
    pub category: String,
}

/// Create a tag and add it to the organization's tag set
pub struct CreateTag {
    organizations: Collection<OrganizationDoc>,
    tags: Collection<TagDoc>,
}

impl CreateTag {
    pub fn new(organizations: Collection<OrganizationDoc>, tags: Collection<TagDoc>) -> Self {
        Self {
            organizations,
            tags,
        }
    }
}

#[async_trait]
impl Interactor for CreateTag {
    type Parent = ();
    type Args = CreateTagInput;
    type Output = Option<TagDto>;

    async fn handle(&self, _: &(), input: CreateTagInput, ctx: &RequestContext) -> Result<Self::Output> {
        ctx.require_identity()?;
        let org_id = parse_id(&input.org_id)?;

        let org = self.organizations.item_by_object_id(org_id).await?;
        if Visibility::check(org, |_| ctx.can(&org_id, PermissionLevel::Member))
            .into_option("create_tag")
            .is_none()
        {
            return Ok(None);
        }

        let label = required_text("label", input.label)?;
        let tag_id = ObjectId::new();
        // Org first: a tag id without a stored tag is skipped on read
        if !self.organizations.add_tag(org_id, tag_id).await? {
            return Ok(None);
        }

        let mut tag = TagDoc::new(label, input.description, input.category);
        tag._id = Some(tag_id);
        let tag = self.tags.insert(tag).await?;
        info!(org_id = %org_id, tag_id = %tag_id, "tag created");
        Ok(Some(tag_dto(tag)))
    }
}
