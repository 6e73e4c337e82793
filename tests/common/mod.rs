//! Shared fixtures for integration tests
//!
//! Everything runs against the in-memory store; documents are seeded
//! directly through the collection accessors.

#![allow(dead_code)]

use async_graphql::{Request, Response, Variables};
use bson::oid::ObjectId;
use std::sync::Arc;

use casework::auth::{Identity, PermissionLevel};
use casework::context::RequestContext;
use casework::db::schemas::{
    ContactDoc, EngagementDoc, OrganizationDoc, ServiceAnswerDoc, ServiceDoc, TagDoc, UserDoc,
};
use casework::db::Collections;
use casework::graphql::{build_schema, CaseworkSchema};
use casework::interactors::Interactors;
use casework::publisher::Publisher;

pub struct Fixture {
    pub collections: Collections,
    pub publisher: Publisher,
    pub interactors: Arc<Interactors>,
    pub schema: CaseworkSchema,
}

impl Fixture {
    pub fn new() -> Self {
        let collections = Collections::in_memory();
        let publisher = Publisher::default();
        let interactors = Arc::new(Interactors::new(&collections, &publisher));
        let schema = build_schema(Arc::clone(&interactors));
        Self {
            collections,
            publisher,
            interactors,
            schema,
        }
    }

    pub async fn org(&self, name: &str) -> OrganizationDoc {
        self.collections
            .organizations
            .insert(OrganizationDoc::new(name.into()))
            .await
            .unwrap()
    }

    /// A user holding the given roles, recorded on both sides
    pub async fn user(&self, username: &str, roles: &[(ObjectId, PermissionLevel)]) -> UserDoc {
        let mut doc = UserDoc::new(
            format!("{} name", username),
            username.into(),
            Some(format!("{}@example.org", username)),
            String::new(),
        );
        for (org_id, permission) in roles {
            doc.grant(*org_id, *permission);
        }
        let user = self.collections.users.insert(doc).await.unwrap();

        for (org_id, permission) in roles {
            self.collections
                .organizations
                .put_member(*org_id, user._id.unwrap(), *permission)
                .await
                .unwrap()
                .unwrap();
        }
        user
    }

    pub async fn tag(&self, label: &str, category: &str) -> TagDoc {
        self.collections
            .tags
            .insert(TagDoc::new(label.into(), String::new(), category.into()))
            .await
            .unwrap()
    }

    pub async fn contact(&self, org_id: ObjectId, name: &str) -> ContactDoc {
        self.collections
            .contacts
            .insert(ContactDoc::new(org_id, name.into()))
            .await
            .unwrap()
    }

    pub async fn engagement(&self, doc: EngagementDoc) -> EngagementDoc {
        self.collections.engagements.insert(doc).await.unwrap()
    }

    pub async fn service(&self, org_id: ObjectId, name: &str, tags: Vec<ObjectId>) -> ServiceDoc {
        let mut doc = ServiceDoc::new(org_id, name.into());
        doc.tags = tags;
        self.collections.services.insert(doc).await.unwrap()
    }

    pub async fn answers(&self, service_id: ObjectId, count: usize) {
        for _ in 0..count {
            self.collections
                .service_answers
                .insert(ServiceAnswerDoc::new(service_id, vec![], vec![]))
                .await
                .unwrap();
        }
    }

    /// Run a GraphQL operation as the given caller
    pub async fn execute(&self, ctx: RequestContext, query: &str, variables: serde_json::Value) -> Response {
        let request = Request::new(query)
            .variables(Variables::from_json(variables))
            .data(ctx);
        self.schema.execute(request).await
    }
}

/// Request context for a stored user
pub fn ctx_for(user: &UserDoc) -> RequestContext {
    RequestContext::authenticated(Identity {
        user_id: user._id.unwrap(),
        username: user.username.clone(),
        roles: user.roles.clone(),
    })
}

pub fn hex(id: Option<ObjectId>) -> String {
    id.unwrap().to_hex()
}

/// `data` of a response as JSON
pub fn data(response: &Response) -> serde_json::Value {
    serde_json::to_value(&response.data).unwrap()
}

/// `extensions.code` of every error in a response
pub fn error_codes(response: &Response) -> Vec<String> {
    response
        .errors
        .iter()
        .filter_map(|e| e.extensions.as_ref())
        .filter_map(|ext| ext.get("code"))
        .map(|code| code.to_string().trim_matches('"').to_string())
        .collect()
}
