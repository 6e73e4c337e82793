//! Engagement and mention subscriptions end to end
//!
//! Subscriptions run through the schema's stream executor; mutations
//! publish on the same publisher the interactors were built with.

mod common;

use async_graphql::{Request, Response, Variables};
use casework::auth::PermissionLevel;
use casework::context::RequestContext;
use casework::db::schemas::EngagementDoc;
use casework::publisher::{channel_key, Publisher, ENGAGEMENT_UPDATE, MENTION};
use common::{ctx_for, data, hex, Fixture};
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use tokio::task::JoinHandle;

const ENGAGEMENT_UPDATES: &str =
    "subscription ($org: ID!) { engagementUpdate(orgId: $org) { title status } }";

/// Start a subscription and return a handle resolving to its first event
fn first_event(fx: &Fixture, ctx: RequestContext, query: &str, vars: serde_json::Value) -> JoinHandle<Option<Response>> {
    let schema = fx.schema.clone();
    let request = Request::new(query)
        .variables(Variables::from_json(vars))
        .data(ctx);
    tokio::spawn(async move {
        let mut stream = schema.execute_stream(request);
        stream.next().await
    })
}

async fn wait_for_subscriber(publisher: &Publisher, key: &str) {
    for _ in 0..200 {
        if publisher.subscriber_count(key) > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no subscriber registered on {}", key);
}

#[tokio::test]
async fn test_engagement_published_before_subscribing_is_not_replayed() {
    let fx = Fixture::new();
    let org9 = fx.org("org9").await;
    let worker = fx.user("worker", &[(org9._id.unwrap(), PermissionLevel::Member)]).await;

    // Nobody listening yet
    let early = EngagementDoc {
        _id: Some(bson::oid::ObjectId::new()),
        ..EngagementDoc::new(org9._id.unwrap(), "early".into())
    };
    assert_eq!(fx.publisher.publish_engagement(early), 0);

    let received = first_event(
        &fx,
        ctx_for(&worker),
        ENGAGEMENT_UPDATES,
        json!({ "org": hex(org9._id) }),
    );
    wait_for_subscriber(&fx.publisher, &channel_key(ENGAGEMENT_UPDATE, &org9._id.unwrap())).await;

    let response = fx
        .execute(
            ctx_for(&worker),
            "mutation ($org: ID!) { createEngagement(input: { orgId: $org, title: \"late\" }) { title } }",
            json!({ "org": hex(org9._id) }),
        )
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let event = tokio::time::timeout(Duration::from_secs(2), received)
        .await
        .expect("no event delivered")
        .unwrap()
        .unwrap();
    assert_eq!(
        data(&event)["engagementUpdate"],
        json!({ "title": "late", "status": "OPEN" })
    );
}

#[tokio::test]
async fn test_update_assigning_user_publishes_assigned_status() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let worker = fx.user("worker", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;
    let engagement = fx
        .engagement(EngagementDoc::new(shelter._id.unwrap(), "Intake".into()))
        .await;

    let received = first_event(
        &fx,
        ctx_for(&worker),
        ENGAGEMENT_UPDATES,
        json!({ "org": hex(shelter._id) }),
    );
    wait_for_subscriber(&fx.publisher, &channel_key(ENGAGEMENT_UPDATE, &shelter._id.unwrap())).await;

    let response = fx
        .execute(
            ctx_for(&worker),
            "mutation ($id: ID!, $user: ID!) { updateEngagement(input: { id: $id, userId: $user }) { status } }",
            json!({ "id": hex(engagement._id), "user": hex(worker._id) }),
        )
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(data(&response)["updateEngagement"]["status"], "ASSIGNED");

    let event = tokio::time::timeout(Duration::from_secs(2), received)
        .await
        .expect("no event delivered")
        .unwrap()
        .unwrap();
    assert_eq!(data(&event)["engagementUpdate"]["status"], "ASSIGNED");
}

#[tokio::test]
async fn test_outsider_subscription_ends_without_events() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let pantry = fx.org("Food Pantry").await;
    let outsider = fx.user("outsider", &[(pantry._id.unwrap(), PermissionLevel::Admin)]).await;

    let received = first_event(
        &fx,
        ctx_for(&outsider),
        ENGAGEMENT_UPDATES,
        json!({ "org": hex(shelter._id) }),
    );

    let event = tokio::time::timeout(Duration::from_secs(2), received)
        .await
        .expect("stream did not end")
        .unwrap();
    assert!(event.is_none());
    assert_eq!(fx.publisher.active_channels(), 0);
}

#[tokio::test]
async fn test_mention_reaches_tagged_user() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let author = fx.user("author", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;
    let tagged = fx.user("tagged", &[(shelter._id.unwrap(), PermissionLevel::Viewer)]).await;
    let engagement = fx
        .engagement(EngagementDoc::new(shelter._id.unwrap(), "Intake".into()))
        .await;

    let received = first_event(
        &fx,
        ctx_for(&tagged),
        "subscription { mention { engagement { title } createdBy { username } } }",
        json!({}),
    );
    wait_for_subscriber(&fx.publisher, &channel_key(MENTION, &tagged._id.unwrap())).await;

    let response = fx
        .execute(
            ctx_for(&author),
            "mutation ($e: ID!, $u: ID!) { createMention(input: { engagementId: $e, taggedUserId: $u }) { createdAt } }",
            json!({ "e": hex(engagement._id), "u": hex(tagged._id) }),
        )
        .await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);

    let event = tokio::time::timeout(Duration::from_secs(2), received)
        .await
        .expect("no mention delivered")
        .unwrap()
        .unwrap();
    assert_eq!(
        data(&event)["mention"],
        json!({ "engagement": { "title": "Intake" }, "createdBy": { "username": "author" } })
    );
}
