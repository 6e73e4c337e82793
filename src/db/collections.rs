//! Shared collection handles
//!
//! Built once at startup and cloned into the request context and the
//! interactors.

use tracing::info;

use crate::db::collection::Collection;
use crate::db::mongo::MongoClient;
use crate::db::schemas::{
    ContactDoc, EngagementDoc, OrganizationDoc, ServiceAnswerDoc, ServiceDoc, TagDoc, UserDoc,
};
use crate::types::Result;

#[derive(Clone)]
pub struct Collections {
    pub organizations: Collection<OrganizationDoc>,
    pub users: Collection<UserDoc>,
    pub contacts: Collection<ContactDoc>,
    pub engagements: Collection<EngagementDoc>,
    pub services: Collection<ServiceDoc>,
    pub service_answers: Collection<ServiceAnswerDoc>,
    pub tags: Collection<TagDoc>,
}

impl Collections {
    /// Process-local collections
    pub fn in_memory() -> Self {
        Self {
            organizations: Collection::in_memory(),
            users: Collection::in_memory(),
            contacts: Collection::in_memory(),
            engagements: Collection::in_memory(),
            services: Collection::in_memory(),
            service_answers: Collection::in_memory(),
            tags: Collection::in_memory(),
        }
    }

    /// Open every MongoDB collection, ensuring indexes
    pub async fn mongo(client: &MongoClient) -> Result<Self> {
        let collections = Self {
            organizations: Collection::mongo(client).await?,
            users: Collection::mongo(client).await?,
            contacts: Collection::mongo(client).await?,
            engagements: Collection::mongo(client).await?,
            services: Collection::mongo(client).await?,
            service_answers: Collection::mongo(client).await?,
            tags: Collection::mongo(client).await?,
        };
        info!("Collections ready in '{}'", client.db_name());
        Ok(collections)
    }
}
