//! Database schemas for casework
//!
//! MongoDB document shapes for organizations, users, contacts, engagements,
//! services, service answers and tags. Mentions are never persisted.

mod contact;
mod engagement;
mod mention;
mod metadata;
mod organization;
mod service;
mod service_answer;
mod tag;
mod user;

pub use contact::{ContactDoc, CONTACT_COLLECTION};
pub use engagement::{EngagementDoc, EngagementStatus, ENGAGEMENT_COLLECTION};
pub use mention::Mention;
pub use metadata::Metadata;
pub use organization::{MemberRole, OrganizationDoc, ORGANIZATION_COLLECTION};
pub use service::{FieldDefinition, FieldType, ServiceDoc, SERVICE_COLLECTION};
pub use service_answer::{AnswerValue, FieldAnswer, ServiceAnswerDoc, SERVICE_ANSWER_COLLECTION};
pub use tag::{TagDoc, TAG_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};

/// Implement [`Entity`](crate::db::Entity) and
/// [`MutMetadata`](crate::db::mongo::MutMetadata) for a document with the
/// usual `_id` and `metadata` fields.
macro_rules! document {
    ($doc:ty, $collection:expr) => {
        impl $crate::db::store::Entity for $doc {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> Option<bson::oid::ObjectId> {
                self._id
            }

            fn set_id(&mut self, id: bson::oid::ObjectId) {
                self._id = Some(id);
            }
        }

        impl $crate::db::mongo::MutMetadata for $doc {
            fn mut_metadata(&mut self) -> &mut $crate::db::schemas::Metadata {
                &mut self.metadata
            }
        }
    };
}

pub(crate) use document;
