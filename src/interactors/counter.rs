//! Tag usage counters
//!
//! Counts are exact. Callers outside the organization get `None`.

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::context::RequestContext;
use crate::db::schemas::{EngagementDoc, ServiceAnswerDoc, ServiceDoc};
use crate::db::Collection;
use crate::interactors::{Interactor, Visibility};
use crate::types::Result;

/// `(org_id, tag_id)`
pub type TagCount = (ObjectId, ObjectId);

/// Service answers recorded against services in an org carrying a tag
pub struct ServiceEntryTagCounter {
    services: Collection<ServiceDoc>,
    service_answers: Collection<ServiceAnswerDoc>,
}

impl ServiceEntryTagCounter {
    pub fn new(services: Collection<ServiceDoc>, service_answers: Collection<ServiceAnswerDoc>) -> Self {
        Self {
            services,
            service_answers,
        }
    }
}

#[async_trait]
impl Interactor for ServiceEntryTagCounter {
    type Parent = ();
    type Args = TagCount;
    type Output = Option<u64>;

    async fn handle(&self, _: &(), (org_id, tag_id): TagCount, ctx: &RequestContext) -> Result<Self::Output> {
        if Visibility::org(ctx, &org_id)
            .into_option("service_entry_tag_counter")
            .is_none()
        {
            return Ok(None);
        }

        let services = self.services.services_for_org_with_tag(org_id, tag_id).await?;
        let mut total = 0;
        for service in services {
            let Some(service_id) = service._id else {
                continue;
            };
            total += self.service_answers.answer_count_for_service(service_id).await?;
        }
        Ok(Some(total))
    }
}

/// Engagements in an org carrying a tag
pub struct EngagementTagCounter {
    engagements: Collection<EngagementDoc>,
}

impl EngagementTagCounter {
    pub fn new(engagements: Collection<EngagementDoc>) -> Self {
        Self { engagements }
    }
}

#[async_trait]
impl Interactor for EngagementTagCounter {
    type Parent = ();
    type Args = TagCount;
    type Output = Option<u64>;

    async fn handle(&self, _: &(), (org_id, tag_id): TagCount, ctx: &RequestContext) -> Result<Self::Output> {
        if Visibility::org(ctx, &org_id)
            .into_option("engagement_tag_counter")
            .is_none()
        {
            return Ok(None);
        }
        Ok(Some(self.engagements.count_tagged_in_org(org_id, tag_id).await?))
    }
}
