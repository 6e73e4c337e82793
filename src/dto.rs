//! GraphQL-facing shapes and their mappers
//!
//! Each DTO carries the stored reference ids it needs for nested field
//! resolution as skipped fields; the nested fields themselves are bound in
//! `graphql::types`.

use async_graphql::{SimpleObject, ID};
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use crate::auth::PermissionLevel;
use crate::db::schemas::{
    AnswerValue, ContactDoc, EngagementDoc, EngagementStatus, FieldDefinition, FieldType,
    Mention, OrganizationDoc, ServiceAnswerDoc, ServiceDoc, TagDoc, UserDoc,
};
use crate::db::{Entity, Page};

fn id_of<T: Entity>(doc: &T) -> ObjectId {
    doc.id().unwrap_or_default()
}

fn gql_id(id: &ObjectId) -> ID {
    ID(id.to_hex())
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex, name = "Organization")]
pub struct OrganizationDto {
    pub id: ID,
    pub name: String,
    #[graphql(skip)]
    pub oid: ObjectId,
    #[graphql(skip)]
    pub member_ids: Vec<ObjectId>,
    #[graphql(skip)]
    pub contact_ids: Vec<ObjectId>,
    #[graphql(skip)]
    pub tag_ids: Vec<ObjectId>,
}

pub fn organization_dto(doc: OrganizationDoc) -> OrganizationDto {
    let oid = id_of(&doc);
    OrganizationDto {
        id: gql_id(&oid),
        member_ids: doc.member_ids(),
        name: doc.name,
        oid,
        contact_ids: doc.contacts,
        tag_ids: doc.tags,
    }
}

#[derive(SimpleObject, Clone, Debug, PartialEq)]
#[graphql(name = "Role")]
pub struct RoleDto {
    pub org_id: ID,
    pub permission: PermissionLevel,
}

/// A user as exposed to a caller
///
/// The redacted projection leaves `username`, `email` and `roles` empty.
#[derive(SimpleObject, Clone, Debug)]
#[graphql(name = "User")]
pub struct UserDto {
    pub id: ID,
    pub name: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub roles: Option<Vec<RoleDto>>,
    /// Whether this is the extended projection
    pub extended: bool,
}

pub fn user_dto(doc: UserDoc, extended: bool) -> UserDto {
    let id = gql_id(&id_of(&doc));
    if !extended {
        return UserDto {
            id,
            name: doc.name,
            username: None,
            email: None,
            roles: None,
            extended,
        };
    }

    UserDto {
        id,
        name: doc.name,
        username: Some(doc.username),
        email: doc.email,
        roles: Some(
            doc.roles
                .iter()
                .map(|r| RoleDto {
                    org_id: gql_id(&r.org_id),
                    permission: r.permission,
                })
                .collect(),
        ),
        extended,
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex, name = "Contact")]
pub struct ContactDto {
    pub id: ID,
    pub org_id: ID,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[graphql(skip)]
    pub org_oid: ObjectId,
    #[graphql(skip)]
    pub tag_ids: Vec<ObjectId>,
    #[graphql(skip)]
    pub engagement_ids: Vec<ObjectId>,
}

pub fn contact_dto(doc: ContactDoc) -> ContactDto {
    ContactDto {
        id: gql_id(&id_of(&doc)),
        org_id: gql_id(&doc.org_id),
        name: doc.name,
        email: doc.email,
        phone: doc.phone,
        org_oid: doc.org_id,
        tag_ids: doc.tags,
        engagement_ids: doc.engagements,
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex, name = "Engagement")]
pub struct EngagementDto {
    pub id: ID,
    pub org_id: ID,
    pub title: String,
    pub description: String,
    pub status: EngagementStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[graphql(skip)]
    pub oid: ObjectId,
    #[graphql(skip)]
    pub org_oid: ObjectId,
    #[graphql(skip)]
    pub user_id: Option<ObjectId>,
    #[graphql(skip)]
    pub contact_ids: Vec<ObjectId>,
    #[graphql(skip)]
    pub tag_ids: Vec<ObjectId>,
}

pub fn engagement_dto(doc: EngagementDoc) -> EngagementDto {
    let oid = id_of(&doc);
    EngagementDto {
        id: gql_id(&oid),
        org_id: gql_id(&doc.org_id),
        title: doc.title,
        description: doc.description,
        status: doc.status,
        start_date: doc.start_date.map(|d| d.to_chrono()),
        end_date: doc.end_date.map(|d| d.to_chrono()),
        updated_at: doc.metadata.updated_at.map(|d| d.to_chrono()),
        oid,
        org_oid: doc.org_id,
        user_id: doc.user_id,
        contact_ids: doc.contacts,
        tag_ids: doc.tags,
    }
}

#[derive(SimpleObject, Clone, Debug, PartialEq)]
#[graphql(name = "FieldDefinition")]
pub struct FieldDefinitionDto {
    pub id: String,
    pub name: String,
    pub field_type: FieldType,
    pub options: Vec<String>,
}

fn field_definition_dto(field: FieldDefinition) -> FieldDefinitionDto {
    FieldDefinitionDto {
        id: field.id,
        name: field.name,
        field_type: field.field_type,
        options: field.options,
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex, name = "Service")]
pub struct ServiceDto {
    pub id: ID,
    pub org_id: ID,
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldDefinitionDto>,
    #[graphql(skip)]
    pub oid: ObjectId,
    #[graphql(skip)]
    pub org_oid: ObjectId,
    #[graphql(skip)]
    pub tag_ids: Vec<ObjectId>,
}

pub fn service_dto(doc: ServiceDoc) -> ServiceDto {
    let oid = id_of(&doc);
    ServiceDto {
        id: gql_id(&oid),
        org_id: gql_id(&doc.org_id),
        name: doc.name,
        description: doc.description,
        fields: doc.fields.into_iter().map(field_definition_dto).collect(),
        oid,
        org_oid: doc.org_id,
        tag_ids: doc.tags,
    }
}

/// One answered field; `value` is set for scalar answers only
#[derive(SimpleObject, Clone, Debug, PartialEq)]
#[graphql(name = "FieldAnswer")]
pub struct FieldAnswerDto {
    pub field_id: String,
    pub value: Option<String>,
    pub values: Vec<String>,
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex, name = "ServiceAnswer")]
pub struct ServiceAnswerDto {
    pub id: ID,
    pub service_id: ID,
    pub fields: Vec<FieldAnswerDto>,
    #[graphql(skip)]
    pub contact_ids: Vec<ObjectId>,
}

pub fn service_answer_dto(doc: ServiceAnswerDoc) -> ServiceAnswerDto {
    ServiceAnswerDto {
        id: gql_id(&id_of(&doc)),
        service_id: gql_id(&doc.service_id),
        fields: doc
            .fields
            .into_iter()
            .map(|answer| FieldAnswerDto {
                value: match &answer.value {
                    AnswerValue::Scalar(value) => Some(value.clone()),
                    AnswerValue::List(_) => None,
                },
                values: answer.value.values(),
                field_id: answer.field_id,
            })
            .collect(),
        contact_ids: doc.contacts,
    }
}

#[derive(SimpleObject, Clone, Debug, PartialEq)]
#[graphql(name = "Tag")]
pub struct TagDto {
    pub id: ID,
    pub label: String,
    pub description: String,
    pub category: String,
}

pub fn tag_dto(doc: TagDoc) -> TagDto {
    TagDto {
        id: gql_id(&id_of(&doc)),
        label: doc.label,
        description: doc.description,
        category: doc.category,
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex, name = "Mention")]
pub struct MentionDto {
    pub created_at: DateTime<Utc>,
    #[graphql(skip)]
    pub engagement_id: ObjectId,
    #[graphql(skip)]
    pub created_by: ObjectId,
    #[graphql(skip)]
    pub tagged_user: Option<ObjectId>,
}

pub fn mention_dto(mention: Mention) -> MentionDto {
    MentionDto {
        created_at: mention.created_at,
        engagement_id: mention.engagement_id,
        created_by: mention.created_by,
        tagged_user: mention.tagged_user,
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(name = "ContactPage")]
pub struct ContactPage {
    pub items: Vec<ContactDto>,
    pub has_more: bool,
}

impl From<Page<ContactDoc>> for ContactPage {
    fn from(page: Page<ContactDoc>) -> Self {
        let page = page.map(contact_dto);
        Self {
            items: page.items,
            has_more: page.has_more,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(name = "EngagementPage")]
pub struct EngagementPage {
    pub items: Vec<EngagementDto>,
    pub has_more: bool,
}

impl From<Page<EngagementDoc>> for EngagementPage {
    fn from(page: Page<EngagementDoc>) -> Self {
        let page = page.map(engagement_dto);
        Self {
            items: page.items,
            has_more: page.has_more,
        }
    }
}

impl ContactPage {
    pub fn empty() -> Self {
        Page::<ContactDoc>::empty().into()
    }
}

impl EngagementPage {
    pub fn empty() -> Self {
        Page::<EngagementDoc>::empty().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::schemas::FieldAnswer;

    fn user() -> UserDoc {
        let mut doc = UserDoc::new(
            "Dana Reyes".into(),
            "dreyes".into(),
            Some("dana@example.org".into()),
            "hash".into(),
        );
        doc._id = Some(ObjectId::new());
        doc.roles.push(Role::new(ObjectId::new(), PermissionLevel::Member));
        doc
    }

    #[test]
    fn test_user_projection_redacts() {
        let redacted = user_dto(user(), false);
        assert_eq!(redacted.name, "Dana Reyes");
        assert!(redacted.username.is_none());
        assert!(redacted.email.is_none());
        assert!(redacted.roles.is_none());

        let extended = user_dto(user(), true);
        assert_eq!(extended.username.as_deref(), Some("dreyes"));
        assert_eq!(extended.email.as_deref(), Some("dana@example.org"));
        assert_eq!(extended.roles.unwrap().len(), 1);
    }

    #[test]
    fn test_answer_values_flatten() {
        let mut doc = ServiceAnswerDoc::new(
            ObjectId::new(),
            vec![],
            vec![
                FieldAnswer {
                    field_id: "income".into(),
                    value: AnswerValue::Scalar("1200".into()),
                },
                FieldAnswer {
                    field_id: "needs".into(),
                    value: AnswerValue::List(vec!["rent".into(), "food".into()]),
                },
            ],
        );
        doc._id = Some(ObjectId::new());

        let dto = service_answer_dto(doc);
        assert_eq!(dto.fields[0].value.as_deref(), Some("1200"));
        assert_eq!(dto.fields[0].values, vec!["1200".to_string()]);
        assert_eq!(dto.fields[1].value, None);
        assert_eq!(dto.fields[1].values.len(), 2);
    }
}
