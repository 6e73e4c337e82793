//! Service and service answer interactors

use async_graphql::{InputObject, ID};
use async_trait::async_trait;
use bson::oid::ObjectId;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use crate::auth::PermissionLevel;
use crate::context::RequestContext;
use crate::db::schemas::{
    AnswerValue, ContactDoc, FieldAnswer, FieldDefinition, FieldType, ServiceAnswerDoc,
    ServiceDoc, TagDoc,
};
use crate::db::{parse_id, Collection};
use crate::dto::{
    contact_dto, service_answer_dto, service_dto, tag_dto, ContactDto, ServiceAnswerDto,
    ServiceDto, TagDto,
};
use crate::interactors::{parse_ids, required_text, Interactor, Visibility};
use crate::refs::{resolve_all, REQUIRED, TAGS};
use crate::types::{CaseworkError, Result};

/// Services offered by one organization
pub struct GetServices {
    services: Collection<ServiceDoc>,
}

impl GetServices {
    pub fn new(services: Collection<ServiceDoc>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Interactor for GetServices {
    type Parent = ();
    type Args = ObjectId;
    type Output = Vec<ServiceDto>;

    async fn handle(&self, _: &(), org_id: ObjectId, ctx: &RequestContext) -> Result<Self::Output> {
        if Visibility::org(ctx, &org_id).into_option("get_services").is_none() {
            return Ok(Vec::new());
        }
        let services = self.services.services_for_org(org_id).await?;
        Ok(services.into_iter().map(service_dto).collect())
    }
}

pub struct GetService {
    services: Collection<ServiceDoc>,
}

impl GetService {
    pub fn new(services: Collection<ServiceDoc>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Interactor for GetService {
    type Parent = ();
    type Args = ObjectId;
    type Output = Option<ServiceDto>;

    async fn handle(&self, _: &(), id: ObjectId, ctx: &RequestContext) -> Result<Self::Output> {
        let service = self.services.item_by_object_id(id).await?;
        Ok(Visibility::check(service, |s| ctx.in_org(&s.org_id))
            .into_option("get_service")
            .map(service_dto))
    }
}

/// Answers recorded for a service the caller can see
pub struct GetServiceAnswers {
    services: Collection<ServiceDoc>,
    service_answers: Collection<ServiceAnswerDoc>,
}

impl GetServiceAnswers {
    pub fn new(services: Collection<ServiceDoc>, service_answers: Collection<ServiceAnswerDoc>) -> Self {
        Self {
            services,
            service_answers,
        }
    }
}

#[async_trait]
impl Interactor for GetServiceAnswers {
    type Parent = ();
    type Args = ObjectId;
    type Output = Vec<ServiceAnswerDto>;

    async fn handle(&self, _: &(), service_id: ObjectId, ctx: &RequestContext) -> Result<Self::Output> {
        let service = self.services.item_by_object_id(service_id).await?;
        if Visibility::check(service, |s| ctx.in_org(&s.org_id))
            .into_option("get_service_answers")
            .is_none()
        {
            return Ok(Vec::new());
        }
        let answers = self.service_answers.answers_for_service(service_id).await?;
        Ok(answers.into_iter().map(service_answer_dto).collect())
    }
}

pub struct ServiceTags {
    tags: Collection<TagDoc>,
}

impl ServiceTags {
    pub fn new(tags: Collection<TagDoc>) -> Self {
        Self { tags }
    }
}

#[async_trait]
impl Interactor for ServiceTags {
    type Parent = ServiceDto;
    type Args = ();
    type Output = Vec<TagDto>;

    async fn handle(&self, service: &ServiceDto, _: (), _: &RequestContext) -> Result<Self::Output> {
        let tags = resolve_all(&self.tags, &service.tag_ids, TAGS).await?;
        Ok(tags.into_iter().map(tag_dto).collect())
    }
}

pub struct ServiceAnswerCount {
    service_answers: Collection<ServiceAnswerDoc>,
}

impl ServiceAnswerCount {
    pub fn new(service_answers: Collection<ServiceAnswerDoc>) -> Self {
        Self { service_answers }
    }
}

#[async_trait]
impl Interactor for ServiceAnswerCount {
    type Parent = ServiceDto;
    type Args = ();
    type Output = u64;

    async fn handle(&self, service: &ServiceDto, _: (), ctx: &RequestContext) -> Result<Self::Output> {
        if !ctx.in_org(&service.org_oid) {
            return Ok(0);
        }
        self.service_answers.answer_count_for_service(service.oid).await
    }
}

pub struct ServiceAnswerContacts {
    contacts: Collection<ContactDoc>,
}

impl ServiceAnswerContacts {
    pub fn new(contacts: Collection<ContactDoc>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl Interactor for ServiceAnswerContacts {
    type Parent = ServiceAnswerDto;
    type Args = ();
    type Output = Vec<ContactDto>;

    async fn handle(&self, answer: &ServiceAnswerDto, _: (), ctx: &RequestContext) -> Result<Self::Output> {
        let contacts = resolve_all(&self.contacts, &answer.contact_ids, REQUIRED).await?;
        Ok(contacts
            .into_iter()
            .filter(|c| ctx.in_org(&c.org_id))
            .map(contact_dto)
            .collect())
    }
}

// ============================================================================
// Mutations
// ============================================================================

#[derive(InputObject, Debug, Clone)]
pub struct FieldDefinitionInput {
    /// Generated when omitted
    pub id: Option<String>,
    pub name: String,
    #[graphql(default)]
    pub field_type: FieldType,
    #[graphql(default)]
    pub options: Vec<String>,
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateServiceInput {
    pub org_id: ID,
    pub name: String,
    #[graphql(default)]
    pub description: String,
    #[graphql(default)]
    pub fields: Vec<FieldDefinitionInput>,
    #[graphql(default)]
    pub tag_ids: Vec<ID>,
}

pub struct CreateService {
    services: Collection<ServiceDoc>,
}

impl CreateService {
    pub fn new(services: Collection<ServiceDoc>) -> Self {
        Self { services }
    }
}

fn field_definitions(inputs: Vec<FieldDefinitionInput>) -> Result<Vec<FieldDefinition>> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(inputs.len());

    for input in inputs {
        let id = match input.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        if !seen.insert(id.clone()) {
            return Err(CaseworkError::BadRequest(format!("Duplicate field id '{}'", id)));
        }
        let needs_options = matches!(input.field_type, FieldType::Select | FieldType::Multiselect);
        if needs_options && input.options.is_empty() {
            return Err(CaseworkError::BadRequest(format!(
                "Field '{}' needs at least one option",
                input.name
            )));
        }
        fields.push(FieldDefinition {
            id,
            name: required_text("field name", input.name)?,
            field_type: input.field_type,
            options: input.options,
        });
    }

    Ok(fields)
}

#[async_trait]
impl Interactor for CreateService {
    type Parent = ();
    type Args = CreateServiceInput;
    type Output = Option<ServiceDto>;

    async fn handle(&self, _: &(), input: CreateServiceInput, ctx: &RequestContext) -> Result<Self::Output> {
        ctx.require_identity()?;
        let org_id = parse_id(&input.org_id)?;
        if Visibility::permit(ctx.can(&org_id, PermissionLevel::Member))
            .into_option("create_service")
            .is_none()
        {
            return Ok(None);
        }

        let mut service = ServiceDoc::new(org_id, required_text("name", input.name)?);
        service.description = input.description;
        service.fields = field_definitions(input.fields)?;
        service.tags = parse_ids(&input.tag_ids)?;

        let service = self.services.insert(service).await?;
        info!(org_id = %org_id, service_id = ?service._id, "service created");
        Ok(Some(service_dto(service)))
    }
}

/// One answered field; exactly one of `value` and `values` is expected
#[derive(InputObject, Debug, Clone)]
pub struct FieldAnswerInput {
    pub field_id: String,
    pub value: Option<String>,
    pub values: Option<Vec<String>>,
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateServiceAnswerInput {
    pub service_id: ID,
    #[graphql(default)]
    pub contact_ids: Vec<ID>,
    pub fields: Vec<FieldAnswerInput>,
}

/// Record answers for a service; every field id must be declared by it
pub struct CreateServiceAnswer {
    services: Collection<ServiceDoc>,
    service_answers: Collection<ServiceAnswerDoc>,
    contacts: Collection<ContactDoc>,
}

impl CreateServiceAnswer {
    pub fn new(
        services: Collection<ServiceDoc>,
        service_answers: Collection<ServiceAnswerDoc>,
        contacts: Collection<ContactDoc>,
    ) -> Self {
        Self {
            services,
            service_answers,
            contacts,
        }
    }
}

fn field_answers(service: &ServiceDoc, inputs: Vec<FieldAnswerInput>) -> Result<Vec<FieldAnswer>> {
    inputs
        .into_iter()
        .map(|input| {
            if !service.defines_field(&input.field_id) {
                return Err(CaseworkError::BadRequest(format!(
                    "Service does not define field '{}'",
                    input.field_id
                )));
            }
            let value = match (input.value, input.values) {
                (Some(value), None) => AnswerValue::Scalar(value),
                (None, Some(values)) => AnswerValue::List(values),
                _ => {
                    return Err(CaseworkError::BadRequest(format!(
                        "Field '{}' needs exactly one of value or values",
                        input.field_id
                    )))
                }
            };
            Ok(FieldAnswer {
                field_id: input.field_id,
                value,
            })
        })
        .collect()
}

#[async_trait]
impl Interactor for CreateServiceAnswer {
    type Parent = ();
    type Args = CreateServiceAnswerInput;
    type Output = Option<ServiceAnswerDto>;

    async fn handle(
        &self,
        _: &(),
        input: CreateServiceAnswerInput,
        ctx: &RequestContext,
    ) -> Result<Self::Output> {
        ctx.require_identity()?;
        let service_id = parse_id(&input.service_id)?;

        let service = self.services.item_by_object_id(service_id).await?;
        let Some(service) =
            Visibility::check(service, |s| ctx.can(&s.org_id, PermissionLevel::Member))
                .into_option("create_service_answer")
        else {
            return Ok(None);
        };

        let fields = field_answers(&service, input.fields)?;
        let contact_ids = parse_ids(&input.contact_ids)?;
        let contacts = self.contacts.items_by_ids(&contact_ids).await?;
        for id in &contact_ids {
            let belongs = contacts
                .iter()
                .any(|c| c._id == Some(*id) && c.org_id == service.org_id);
            if !belongs {
                return Err(CaseworkError::BadRequest(format!(
                    "Contact {} is not in this organization",
                    id
                )));
            }
        }

        let answer = self
            .service_answers
            .insert(ServiceAnswerDoc::new(service_id, contact_ids, fields))
            .await?;
        info!(service_id = %service_id, answer_id = ?answer._id, "service answer recorded");
        Ok(Some(service_answer_dto(answer)))
    }
}
