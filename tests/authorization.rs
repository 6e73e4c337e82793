//! Organization scoping through the GraphQL schema
//!
//! Covers:
//! - Extended vs redacted user projection
//! - Out-of-org reads resolving to null / empty lists
//! - Write permission levels and unauthenticated writes

mod common;

use casework::auth::PermissionLevel;
use casework::context::RequestContext;
use casework::db::schemas::EngagementDoc;
use common::{ctx_for, data, error_codes, hex, Fixture};
use serde_json::json;

const GET_USER: &str = r#"
    query ($id: ID!) {
        getUser(id: $id) { name username email extended roles { orgId permission } }
    }
"#;

// =============================================================================
// User projection
// =============================================================================

#[tokio::test]
async fn test_user_projection_follows_shared_orgs() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let pantry = fx.org("Food Pantry").await;

    let alice = fx.user("alice", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;
    let bob = fx.user("bob", &[(shelter._id.unwrap(), PermissionLevel::Viewer)]).await;
    let carol = fx.user("carol", &[(pantry._id.unwrap(), PermissionLevel::Admin)]).await;

    // Same organization: extended
    let response = fx.execute(ctx_for(&alice), GET_USER, json!({ "id": hex(bob._id) })).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let user = &data(&response)["getUser"];
    assert_eq!(user["extended"], true);
    assert_eq!(user["username"], "bob");
    assert_eq!(user["email"], "bob@example.org");
    assert_eq!(user["roles"][0]["permission"], "VIEWER");

    // Different organization: redacted
    let response = fx.execute(ctx_for(&carol), GET_USER, json!({ "id": hex(bob._id) })).await;
    let user = &data(&response)["getUser"];
    assert_eq!(user["extended"], false);
    assert_eq!(user["name"], "bob name");
    assert!(user["username"].is_null());
    assert!(user["email"].is_null());
    assert!(user["roles"].is_null());

    // Self: extended even without shared orgs
    let response = fx.execute(ctx_for(&carol), GET_USER, json!({ "id": hex(carol._id) })).await;
    assert_eq!(data(&response)["getUser"]["extended"], true);

    // Anonymous: redacted
    let response = fx
        .execute(RequestContext::anonymous(), GET_USER, json!({ "id": hex(alice._id) }))
        .await;
    assert_eq!(data(&response)["getUser"]["extended"], false);
}

// =============================================================================
// Out-of-org reads
// =============================================================================

#[tokio::test]
async fn test_out_of_org_engagement_is_null() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let pantry = fx.org("Food Pantry").await;
    let alice = fx.user("alice", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;
    let carol = fx.user("carol", &[(pantry._id.unwrap(), PermissionLevel::Member)]).await;

    let engagement = fx
        .engagement(EngagementDoc::new(shelter._id.unwrap(), "Housing intake".into()))
        .await;
    let query = "query ($id: ID!) { getEngagement(id: $id) { title status } }";
    let vars = json!({ "id": hex(engagement._id) });

    let response = fx.execute(ctx_for(&carol), query, vars.clone()).await;
    assert!(response.errors.is_empty());
    assert!(data(&response)["getEngagement"].is_null());

    let response = fx.execute(ctx_for(&alice), query, vars).await;
    assert_eq!(data(&response)["getEngagement"]["title"], "Housing intake");
    assert_eq!(data(&response)["getEngagement"]["status"], "OPEN");
}

#[tokio::test]
async fn test_out_of_org_services_are_empty() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let pantry = fx.org("Food Pantry").await;
    let alice = fx.user("alice", &[(shelter._id.unwrap(), PermissionLevel::Viewer)]).await;
    let carol = fx.user("carol", &[(pantry._id.unwrap(), PermissionLevel::Admin)]).await;
    fx.service(shelter._id.unwrap(), "Rental assistance", vec![]).await;

    let query = "query ($org: ID!) { getServices(orgId: $org) { name } }";
    let vars = json!({ "org": hex(shelter._id) });

    let response = fx.execute(ctx_for(&carol), query, vars.clone()).await;
    assert!(response.errors.is_empty());
    assert_eq!(data(&response)["getServices"], json!([]));

    let response = fx.execute(ctx_for(&alice), query, vars).await;
    assert_eq!(data(&response)["getServices"], json!([{ "name": "Rental assistance" }]));
}

#[tokio::test]
async fn test_contact_pages_report_more() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let alice = fx.user("alice", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;
    for name in ["Ana", "Ben", "Cruz"] {
        fx.contact(shelter._id.unwrap(), name).await;
    }

    let query = r#"
        query ($org: ID!, $offset: Int, $limit: Int) {
            getContacts(orgId: $org, offset: $offset, limit: $limit) { items { name } hasMore }
        }
    "#;

    let response = fx
        .execute(ctx_for(&alice), query, json!({ "org": hex(shelter._id), "limit": 2 }))
        .await;
    let page = &data(&response)["getContacts"];
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["hasMore"], true);

    let response = fx
        .execute(
            ctx_for(&alice),
            query,
            json!({ "org": hex(shelter._id), "offset": 2, "limit": 2 }),
        )
        .await;
    let page = &data(&response)["getContacts"];
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["hasMore"], false);
}

// =============================================================================
// Writes
// =============================================================================

const CREATE_CONTACT: &str = r#"
    mutation ($org: ID!) {
        createContact(input: { orgId: $org, name: "Dee" }) { name orgId }
    }
"#;

#[tokio::test]
async fn test_unauthenticated_mutation_is_rejected() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;

    let response = fx
        .execute(RequestContext::anonymous(), CREATE_CONTACT, json!({ "org": hex(shelter._id) }))
        .await;
    assert_eq!(error_codes(&response), vec!["UNAUTHENTICATED".to_string()]);
}

#[tokio::test]
async fn test_viewer_cannot_write() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let viewer = fx.user("vic", &[(shelter._id.unwrap(), PermissionLevel::Viewer)]).await;
    let member = fx.user("meg", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;
    let vars = json!({ "org": hex(shelter._id) });

    let response = fx.execute(ctx_for(&viewer), CREATE_CONTACT, vars.clone()).await;
    assert!(response.errors.is_empty());
    assert!(data(&response)["createContact"].is_null());

    let response = fx.execute(ctx_for(&member), CREATE_CONTACT, vars).await;
    assert_eq!(data(&response)["createContact"]["name"], "Dee");

    let org = fx
        .collections
        .organizations
        .item_by_object_id(shelter._id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(org.contacts.len(), 1);
}

#[tokio::test]
async fn test_malformed_id_is_bad_input() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let alice = fx.user("alice", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;

    let response = fx
        .execute(ctx_for(&alice), "{ getEngagement(id: \"not-an-id\") { title } }", json!({}))
        .await;
    assert_eq!(error_codes(&response), vec!["BAD_USER_INPUT".to_string()]);
}
