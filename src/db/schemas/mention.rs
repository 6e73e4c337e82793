//! Mention event
//!
//! A mention flags an engagement to a case worker. It is published to the
//! tagged user's channel and never stored.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq)]
pub struct Mention {
    pub engagement_id: ObjectId,
    pub created_by: ObjectId,
    pub tagged_user: Option<ObjectId>,
    pub created_at: DateTime<Utc>,
}

impl Mention {
    pub fn new(engagement_id: ObjectId, created_by: ObjectId, tagged_user: Option<ObjectId>) -> Self {
        Self {
            engagement_id,
            created_by,
            tagged_user,
            created_at: Utc::now(),
        }
    }
}
