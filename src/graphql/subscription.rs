//! Subscription root

use async_graphql::{Context, Result, Subscription, ID};
use futures::stream::BoxStream;

use crate::db::parse_id;
use crate::dto::{EngagementDto, MentionDto};
use crate::graphql::{gql, wiring};
use crate::interactors::Interactor;

#[derive(Default)]
pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Engagements created or updated in an organization
    async fn engagement_update(
        &self,
        ctx: &Context<'_>,
        org_id: ID,
    ) -> Result<BoxStream<'static, EngagementDto>> {
        let (i, rc) = wiring(ctx)?;
        let org_id = gql(parse_id(&org_id))?;
        gql(i.engagement_updates.handle(&(), org_id, rc).await)
    }

    /// Mentions addressed to the caller
    async fn mention(&self, ctx: &Context<'_>) -> Result<BoxStream<'static, MentionDto>> {
        let (i, rc) = wiring(ctx)?;
        gql(i.mentions.handle(&(), (), rc).await)
    }
}
