//! Denied and not-found lookups return the same `null` but log different
//! outcomes

mod common;

use bson::oid::ObjectId;
use casework::auth::PermissionLevel;
use casework::db::schemas::EngagementDoc;
use common::{ctx_for, data, Fixture};
use serde_json::{json, Value};
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    /// `outcome` fields logged for one operation, in order
    fn outcomes(&self, operation: &str) -> Vec<String> {
        let raw = self.0.lock().unwrap().clone();
        String::from_utf8(raw)
            .unwrap()
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter(|event| event["fields"]["operation"] == operation)
            .filter_map(|event| event["fields"]["outcome"].as_str().map(String::from))
            .collect()
    }
}

#[test]
fn test_denied_and_missing_engagements_log_distinct_outcomes() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        tokio_test::block_on(async {
            let fx = Fixture::new();
            let shelter = fx.org("Northside Shelter").await;
            let pantry = fx.org("Food Pantry").await;
            let carol = fx.user("carol", &[(pantry._id.unwrap(), PermissionLevel::Member)]).await;
            let engagement = fx
                .engagement(EngagementDoc::new(shelter._id.unwrap(), "Housing intake".into()))
                .await;

            let query = "query ($id: ID!) { getEngagement(id: $id) { title } }";

            let denied = fx
                .execute(ctx_for(&carol), query, json!({ "id": engagement._id.unwrap().to_hex() }))
                .await;
            assert!(data(&denied)["getEngagement"].is_null());

            let missing = fx
                .execute(ctx_for(&carol), query, json!({ "id": ObjectId::new().to_hex() }))
                .await;
            assert!(data(&missing)["getEngagement"].is_null());
        });
    });

    assert_eq!(captured.outcomes("get_engagement"), vec!["denied", "not_found"]);
}
