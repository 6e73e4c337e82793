//! Stored reference resolution through nested fields
//!
//! Tags tolerate dangling references; contacts and users do not. A missing
//! required reference fails its own field and nothing else.

mod common;

use bson::oid::ObjectId;
use casework::auth::PermissionLevel;
use casework::db::schemas::EngagementDoc;
use casework::db::Update;
use common::{ctx_for, data, error_codes, hex, Fixture};
use serde_json::json;

const ENGAGEMENT_WITH_REFS: &str = r#"
    query ($id: ID!) {
        getEngagement(id: $id) {
            title
            tags { label }
            contacts { name }
            user { name }
        }
    }
"#;

#[tokio::test]
async fn test_tags_tolerate_dangling_references() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let alice = fx.user("alice", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;
    let housing = fx.tag("housing", "needs").await;
    let ana = fx.contact(shelter._id.unwrap(), "Ana").await;

    let mut doc = EngagementDoc::new(shelter._id.unwrap(), "Intake".into());
    doc.tags = vec![ObjectId::new(), housing._id.unwrap()];
    doc.contacts = vec![ana._id.unwrap()];
    let engagement = fx.engagement(doc).await;

    let response = fx
        .execute(ctx_for(&alice), ENGAGEMENT_WITH_REFS, json!({ "id": hex(engagement._id) }))
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let engagement = &data(&response)["getEngagement"];
    assert_eq!(engagement["tags"], json!([{ "label": "housing" }]));
    assert_eq!(engagement["contacts"], json!([{ "name": "Ana" }]));
    assert!(engagement["user"].is_null());
}

#[tokio::test]
async fn test_missing_contact_fails_only_its_field() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let alice = fx.user("alice", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;
    let housing = fx.tag("housing", "needs").await;
    let ana = fx.contact(shelter._id.unwrap(), "Ana").await;

    let mut doc = EngagementDoc::new(shelter._id.unwrap(), "Intake".into());
    doc.tags = vec![housing._id.unwrap()];
    doc.contacts = vec![ana._id.unwrap(), ObjectId::new()];
    let engagement = fx.engagement(doc).await;

    let response = fx
        .execute(ctx_for(&alice), ENGAGEMENT_WITH_REFS, json!({ "id": hex(engagement._id) }))
        .await;

    assert_eq!(error_codes(&response), vec!["MISSING_REFERENCE".to_string()]);
    assert_eq!(
        serde_json::to_value(&response.errors[0].path).unwrap(),
        json!(["getEngagement", "contacts"])
    );

    let engagement = &data(&response)["getEngagement"];
    assert_eq!(engagement["title"], "Intake");
    assert_eq!(engagement["tags"], json!([{ "label": "housing" }]));
    assert!(engagement["contacts"].is_null());
}

#[tokio::test]
async fn test_dangling_assignee_is_missing_reference() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let alice = fx.user("alice", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;

    let mut doc = EngagementDoc::new(shelter._id.unwrap(), "Follow-up".into());
    doc.user_id = Some(ObjectId::new());
    let engagement = fx.engagement(doc).await;

    let response = fx
        .execute(ctx_for(&alice), ENGAGEMENT_WITH_REFS, json!({ "id": hex(engagement._id) }))
        .await;

    assert_eq!(error_codes(&response), vec!["MISSING_REFERENCE".to_string()]);
    assert_eq!(data(&response)["getEngagement"]["title"], "Follow-up");
}

#[tokio::test]
async fn test_assignee_resolves_with_projection() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let alice = fx.user("alice", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;

    let mut doc = EngagementDoc::new(shelter._id.unwrap(), "Follow-up".into());
    doc.user_id = alice._id;
    let engagement = fx.engagement(doc).await;

    let query = "query ($id: ID!) { getEngagement(id: $id) { user { username extended } } }";
    let response = fx
        .execute(ctx_for(&alice), query, json!({ "id": hex(engagement._id) }))
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        data(&response)["getEngagement"]["user"],
        json!({ "username": "alice", "extended": true })
    );
}

#[tokio::test]
async fn test_deleted_member_fails_only_the_users_field() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let alice = fx.user("alice", &[(shelter._id.unwrap(), PermissionLevel::Admin)]).await;
    let gone = fx.user("gone", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;

    fx.collections
        .users
        .update(gone._id.unwrap(), Update::new().set("metadata.is_deleted", true))
        .await
        .unwrap()
        .unwrap();

    let query = "query ($id: ID!) { getOrganization(id: $id) { name users { name } } }";
    let response = fx
        .execute(ctx_for(&alice), query, json!({ "id": hex(shelter._id) }))
        .await;

    assert_eq!(error_codes(&response), vec!["MISSING_REFERENCE".to_string()]);
    assert_eq!(
        serde_json::to_value(&response.errors[0].path).unwrap(),
        json!(["getOrganization", "users"])
    );

    let org = &data(&response)["getOrganization"];
    assert_eq!(org["name"], "Northside Shelter");
    assert!(org["users"].is_null());
}
