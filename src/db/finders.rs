//! Entity-specific finders and list updates
//!
//! Named queries and atomic list changes layered on the generic
//! [`Collection`] accessor so interactors never build filters by hand.

use bson::{doc, oid::ObjectId, Bson};

use crate::db::collection::Collection;
use crate::auth::{PermissionLevel, Role};
use crate::db::filter::{Filter, Page, Pagination};
use crate::db::schemas::{
    ContactDoc, EngagementDoc, EngagementStatus, OrganizationDoc, ServiceAnswerDoc, ServiceDoc,
    MemberRole, TagDoc, UserDoc,
};
use crate::db::update::Update;
use crate::types::Result;

impl Collection<ContactDoc> {
    pub async fn contacts_for_org(&self, org_id: ObjectId, window: Pagination) -> Result<Page<ContactDoc>> {
        self.items(window, &Filter::new().eq("org_id", org_id)).await
    }

    pub async fn link_engagement(&self, contact_id: ObjectId, engagement_id: ObjectId) -> Result<bool> {
        let update = Update::new().add_to_set("engagements", engagement_id);
        Ok(self.update(contact_id, update).await?.is_some())
    }

    pub async fn unlink_engagement(&self, contact_id: ObjectId, engagement_id: ObjectId) -> Result<bool> {
        let update = Update::new().pull("engagements", engagement_id);
        Ok(self.update(contact_id, update).await?.is_some())
    }
}

impl Collection<EngagementDoc> {
    pub async fn engagements_for_org(
        &self,
        org_id: ObjectId,
        status: Option<EngagementStatus>,
        window: Pagination,
    ) -> Result<Page<EngagementDoc>> {
        let mut filter = Filter::new().eq("org_id", org_id);
        if let Some(status) = status {
            filter = filter.eq("status", status.as_str());
        }
        self.items(window, &filter).await
    }

    /// Engagements in an organization carrying `tag_id`
    pub async fn count_tagged_in_org(&self, org_id: ObjectId, tag_id: ObjectId) -> Result<u64> {
        self.count(&Filter::new().eq("org_id", org_id).eq("tags", tag_id))
            .await
    }
}

impl Collection<ServiceDoc> {
    pub async fn services_for_org(&self, org_id: ObjectId) -> Result<Vec<ServiceDoc>> {
        self.all(&Filter::new().eq("org_id", org_id)).await
    }

    pub async fn services_for_org_with_tag(
        &self,
        org_id: ObjectId,
        tag_id: ObjectId,
    ) -> Result<Vec<ServiceDoc>> {
        self.all(&Filter::new().eq("org_id", org_id).eq("tags", tag_id))
            .await
    }
}

impl Collection<ServiceAnswerDoc> {
    pub async fn answers_for_service(&self, service_id: ObjectId) -> Result<Vec<ServiceAnswerDoc>> {
        self.all(&Filter::new().eq("service_id", service_id)).await
    }

    pub async fn answer_count_for_service(&self, service_id: ObjectId) -> Result<u64> {
        self.count(&Filter::new().eq("service_id", service_id)).await
    }
}

impl Collection<UserDoc> {
    pub async fn user_by_username(&self, username: &str) -> Result<Option<UserDoc>> {
        let mut found = self
            .all(&Filter::new().eq("username", Bson::String(username.to_string())))
            .await?;
        Ok(if found.is_empty() { None } else { Some(found.swap_remove(0)) })
    }

    /// The user, provided they hold a role in the organization
    pub async fn member_of_org(&self, user_id: ObjectId, org_id: ObjectId) -> Result<Option<UserDoc>> {
        let mut found = self
            .all(&Filter::by_id(user_id).eq("roles.org_id", org_id))
            .await?;
        Ok(found.pop())
    }

    /// Set the user's role in an organization, replacing any earlier one
    ///
    /// Two concurrent grants for the same organization can leave both
    /// roles in place; the higher permission wins when roles are read.
    pub async fn put_role(
        &self,
        user_id: ObjectId,
        org_id: ObjectId,
        permission: PermissionLevel,
    ) -> Result<Option<UserDoc>> {
        let role = bson::to_bson(&Role::new(org_id, permission))?;
        let cleared = self
            .update(user_id, Update::new().pull("roles", doc! { "org_id": org_id }))
            .await?;
        if cleared.is_none() {
            return Ok(None);
        }
        self.update(user_id, Update::new().add_to_set("roles", role)).await
    }

    /// Bump the token version, invalidating every token issued so far
    pub async fn revoke_tokens(&self, user_id: ObjectId) -> Result<Option<UserDoc>> {
        self.update(user_id, Update::new().inc("token_version", 1i32))
            .await
    }
}

impl Collection<OrganizationDoc> {
    pub async fn organizations_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<OrganizationDoc>> {
        let mut orgs = self.items_by_ids(ids).await?;
        orgs.sort_by_key(|o| o._id);
        Ok(orgs)
    }

    pub async fn add_tag(&self, org_id: ObjectId, tag_id: ObjectId) -> Result<bool> {
        let update = Update::new().add_to_set("tags", tag_id);
        Ok(self.update(org_id, update).await?.is_some())
    }

    pub async fn add_contact(&self, org_id: ObjectId, contact_id: ObjectId) -> Result<bool> {
        let update = Update::new().add_to_set("contacts", contact_id);
        Ok(self.update(org_id, update).await?.is_some())
    }

    /// Set a member's permission, adding the member when absent
    pub async fn put_member(
        &self,
        org_id: ObjectId,
        user_id: ObjectId,
        permission: PermissionLevel,
    ) -> Result<Option<OrganizationDoc>> {
        let member = bson::to_bson(&MemberRole {
            user_id,
            org_id,
            permission,
        })?;
        let cleared = self
            .update(org_id, Update::new().pull("users", doc! { "user_id": user_id }))
            .await?;
        if cleared.is_none() {
            return Ok(None);
        }
        self.update(org_id, Update::new().add_to_set("users", member)).await
    }
}

impl Collection<TagDoc> {
    pub async fn tags_in_category(&self, ids: &[ObjectId], category: Option<&str>) -> Result<Vec<TagDoc>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut filter = Filter::new().one_of("_id", ids.iter().copied());
        if let Some(category) = category {
            filter = filter.eq("category", category);
        }
        self.all(&filter).await
    }
}
