//! Tag usage counters

mod common;

use casework::auth::PermissionLevel;
use casework::db::schemas::EngagementDoc;
use common::{ctx_for, data, hex, Fixture};
use serde_json::json;

const SERVICE_ENTRY_COUNT: &str = r#"
    query ($org: ID!, $tag: ID!) { serviceEntryTagCount(orgId: $org, tagId: $tag) }
"#;

#[tokio::test]
async fn test_service_entry_count_sums_tagged_services() {
    let fx = Fixture::new();
    let clinic = fx.org("Community Clinic").await;
    let other = fx.org("Other Clinic").await;
    let nurse = fx.user("nurse", &[(clinic._id.unwrap(), PermissionLevel::Viewer)]).await;
    let outsider = fx.user("outsider", &[(other._id.unwrap(), PermissionLevel::Admin)]).await;

    let diabetes = fx.tag("diabetes", "condition").await;
    let tag_id = diabetes._id.unwrap();

    let screening = fx.service(clinic._id.unwrap(), "Screening", vec![tag_id]).await;
    let education = fx.service(clinic._id.unwrap(), "Education", vec![tag_id]).await;
    let dental = fx.service(clinic._id.unwrap(), "Dental", vec![]).await;
    let elsewhere = fx.service(other._id.unwrap(), "Screening", vec![tag_id]).await;

    fx.answers(screening._id.unwrap(), 3).await;
    fx.answers(education._id.unwrap(), 2).await;
    fx.answers(dental._id.unwrap(), 4).await;
    fx.answers(elsewhere._id.unwrap(), 7).await;

    let vars = json!({ "org": hex(clinic._id), "tag": hex(diabetes._id) });

    let response = fx.execute(ctx_for(&nurse), SERVICE_ENTRY_COUNT, vars.clone()).await;
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(data(&response)["serviceEntryTagCount"], 5);

    let response = fx.execute(ctx_for(&outsider), SERVICE_ENTRY_COUNT, vars).await;
    assert!(response.errors.is_empty());
    assert!(data(&response)["serviceEntryTagCount"].is_null());
}

#[tokio::test]
async fn test_service_answer_count_field() {
    let fx = Fixture::new();
    let clinic = fx.org("Community Clinic").await;
    let nurse = fx.user("nurse", &[(clinic._id.unwrap(), PermissionLevel::Member)]).await;
    let screening = fx.service(clinic._id.unwrap(), "Screening", vec![]).await;
    fx.answers(screening._id.unwrap(), 3).await;

    let query = "query ($id: ID!) { getService(id: $id) { name answerCount } }";
    let response = fx
        .execute(ctx_for(&nurse), query, json!({ "id": hex(screening._id) }))
        .await;
    assert_eq!(
        data(&response)["getService"],
        json!({ "name": "Screening", "answerCount": 3 })
    );
}

#[tokio::test]
async fn test_engagement_tag_count() {
    let fx = Fixture::new();
    let shelter = fx.org("Northside Shelter").await;
    let worker = fx.user("worker", &[(shelter._id.unwrap(), PermissionLevel::Member)]).await;
    let housing = fx.tag("housing", "needs").await;
    let food = fx.tag("food", "needs").await;

    for (title, tags) in [
        ("a", vec![housing._id.unwrap()]),
        ("b", vec![housing._id.unwrap(), food._id.unwrap()]),
        ("c", vec![food._id.unwrap()]),
    ] {
        let mut doc = EngagementDoc::new(shelter._id.unwrap(), title.into());
        doc.tags = tags;
        fx.engagement(doc).await;
    }

    let query = "query ($org: ID!, $tag: ID!) { engagementTagCount(orgId: $org, tagId: $tag) }";
    let response = fx
        .execute(
            ctx_for(&worker),
            query,
            json!({ "org": hex(shelter._id), "tag": hex(housing._id) }),
        )
        .await;
    assert_eq!(data(&response)["engagementTagCount"], 2);
}
