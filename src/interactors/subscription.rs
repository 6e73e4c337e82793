//! Subscription interactors
//!
//! Authorization is decided when the subscription starts. A caller without
//! access gets a stream that ends immediately.

use async_trait::async_trait;
use bson::oid::ObjectId;
use futures::stream::{self, BoxStream};
use futures::StreamExt;

use crate::context::RequestContext;
use crate::dto::{engagement_dto, mention_dto, EngagementDto, MentionDto};
use crate::interactors::{Interactor, Visibility};
use crate::publisher::Publisher;
use crate::types::Result;

pub struct EngagementUpdates {
    publisher: Publisher,
}

impl EngagementUpdates {
    pub fn new(publisher: Publisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Interactor for EngagementUpdates {
    type Parent = ();
    type Args = ObjectId;
    type Output = BoxStream<'static, EngagementDto>;

    async fn handle(&self, _: &(), org_id: ObjectId, ctx: &RequestContext) -> Result<Self::Output> {
        if Visibility::org(ctx, &org_id)
            .into_option("engagement_updates")
            .is_none()
        {
            return Ok(stream::empty().boxed());
        }
        Ok(self
            .publisher
            .subscribe_engagements(&org_id)
            .map(engagement_dto)
            .boxed())
    }
}

/// Mentions addressed to the caller
pub struct Mentions {
    publisher: Publisher,
}

impl Mentions {
    pub fn new(publisher: Publisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Interactor for Mentions {
    type Parent = ();
    type Args = ();
    type Output = BoxStream<'static, MentionDto>;

    async fn handle(&self, _: &(), _: (), ctx: &RequestContext) -> Result<Self::Output> {
        let Some(identity) = ctx.identity() else {
            return Ok(stream::empty().boxed());
        };
        Ok(self
            .publisher
            .subscribe_mentions(&identity.user_id)
            .map(mention_dto)
            .boxed())
    }
}
