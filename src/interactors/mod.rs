//! Interactors
//!
//! One interactor per GraphQL query, mutation, subscription and nested
//! field. Each is constructed with the accessors it uses and applies the
//! organization-scoping rules itself: callers outside the owning
//! organization get `None` or an empty list, never an error.

mod contact;
mod counter;
mod engagement;
mod mention;
mod organization;
mod service;
mod subscription;
mod tag;
mod user;

use async_graphql::ID;
use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::debug;

use crate::context::RequestContext;
use crate::db::{parse_id, Collections};
use crate::publisher::Publisher;
use crate::types::{CaseworkError, Result};

pub use contact::{
    ContactEngagements, ContactTags, CreateContact, CreateContactInput, GetContact, GetContacts,
    UpdateContact, UpdateContactInput,
};
pub use counter::{EngagementTagCounter, ServiceEntryTagCounter, TagCount};
pub use engagement::{
    CreateEngagement, CreateEngagementInput, EngagementContacts, EngagementQuery, EngagementTags,
    EngagementUser, GetEngagement, GetEngagements, UpdateEngagement, UpdateEngagementInput,
};
pub use mention::{
    CreateMention, CreateMentionInput, MentionCreatedBy, MentionEngagement, MentionTaggedUser,
};
pub use organization::{
    AddMember, AddMemberInput, CreateOrganization, CreateOrganizationInput, GetOrganization,
    GetOrganizations, OrganizationContacts, OrganizationTags, OrganizationUsers,
};
pub use service::{
    CreateService, CreateServiceAnswer, CreateServiceAnswerInput, CreateServiceInput,
    FieldAnswerInput, FieldDefinitionInput, GetService, GetServiceAnswers, GetServices,
    ServiceAnswerContacts, ServiceAnswerCount, ServiceTags,
};
pub use subscription::{EngagementUpdates, Mentions};
pub use tag::{CreateTag, CreateTagInput, GetTags};
pub use user::{GetMe, GetUser};

/// Single-purpose handler bound to one API operation or resolved field
#[async_trait]
pub trait Interactor: Send + Sync {
    /// Object the field hangs off; `()` for root operations
    type Parent: Send + Sync;
    type Args: Send;
    type Output: Send;

    async fn handle(
        &self,
        parent: &Self::Parent,
        args: Self::Args,
        ctx: &RequestContext,
    ) -> Result<Self::Output>;
}

/// Outcome of an org-scoped lookup
///
/// Denied and missing both surface as `None`; they are kept apart so the
/// logs can tell them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Visibility<T> {
    Visible(T),
    Denied,
    Missing,
}

impl<T> Visibility<T> {
    /// Classify a lookup result against an access predicate
    pub fn check(item: Option<T>, allowed: impl FnOnce(&T) -> bool) -> Self {
        match item {
            None => Visibility::Missing,
            Some(item) if allowed(&item) => Visibility::Visible(item),
            Some(_) => Visibility::Denied,
        }
    }

    /// A lookup with no access restriction
    pub fn found(item: Option<T>) -> Self {
        Self::check(item, |_| true)
    }

    /// Collapse to an option, logging why nothing was returned
    pub fn into_option(self, operation: &'static str) -> Option<T> {
        match self {
            Visibility::Visible(item) => Some(item),
            Visibility::Denied => {
                debug!(operation, outcome = "denied", "access outside caller's organizations");
                None
            }
            Visibility::Missing => {
                debug!(operation, outcome = "not_found", "no matching document");
                None
            }
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, Visibility::Visible(_))
    }
}

impl Visibility<()> {
    /// Visible when the caller holds any role in the organization
    pub fn org(ctx: &RequestContext, org_id: &ObjectId) -> Self {
        Self::permit(ctx.in_org(org_id))
    }

    pub fn permit(allowed: bool) -> Self {
        if allowed {
            Visibility::Visible(())
        } else {
            Visibility::Denied
        }
    }
}

/// Trimmed non-empty text, or `BadRequest`
pub(crate) fn required_text(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CaseworkError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Parse a list of GraphQL ids, rejecting the whole list on a malformed one
pub(crate) fn parse_ids(ids: &[ID]) -> Result<Vec<ObjectId>> {
    ids.iter().map(|id| parse_id(id)).collect()
}

// ============================================================================
// Wiring
// ============================================================================

/// Every interactor, assembled once at startup
pub struct Interactors {
    // Queries
    pub get_organization: GetOrganization,
    pub get_organizations: GetOrganizations,
    pub get_user: GetUser,
    pub get_me: GetMe,
    pub get_contact: GetContact,
    pub get_contacts: GetContacts,
    pub get_engagement: GetEngagement,
    pub get_engagements: GetEngagements,
    pub get_services: GetServices,
    pub get_service: GetService,
    pub get_service_answers: GetServiceAnswers,
    pub get_tags: GetTags,
    pub service_entry_tag_counter: ServiceEntryTagCounter,
    pub engagement_tag_counter: EngagementTagCounter,

    // Type fields
    pub organization_tags: OrganizationTags,
    pub organization_contacts: OrganizationContacts,
    pub organization_users: OrganizationUsers,
    pub contact_tags: ContactTags,
    pub contact_engagements: ContactEngagements,
    pub engagement_user: EngagementUser,
    pub engagement_contacts: EngagementContacts,
    pub engagement_tags: EngagementTags,
    pub service_tags: ServiceTags,
    pub service_answer_count: ServiceAnswerCount,
    pub service_answer_contacts: ServiceAnswerContacts,
    pub mention_engagement: MentionEngagement,
    pub mention_created_by: MentionCreatedBy,
    pub mention_tagged_user: MentionTaggedUser,

    // Mutations
    pub create_organization: CreateOrganization,
    pub add_member: AddMember,
    pub create_contact: CreateContact,
    pub update_contact: UpdateContact,
    pub create_engagement: CreateEngagement,
    pub update_engagement: UpdateEngagement,
    pub create_service: CreateService,
    pub create_service_answer: CreateServiceAnswer,
    pub create_tag: CreateTag,
    pub create_mention: CreateMention,

    // Subscriptions
    pub engagement_updates: EngagementUpdates,
    pub mentions: Mentions,
}

impl Interactors {
    pub fn new(c: &Collections, publisher: &Publisher) -> Self {
        Self {
            get_organization: GetOrganization::new(c.organizations.clone()),
            get_organizations: GetOrganizations::new(c.organizations.clone()),
            get_user: GetUser::new(c.users.clone()),
            get_me: GetMe::new(c.users.clone()),
            get_contact: GetContact::new(c.contacts.clone()),
            get_contacts: GetContacts::new(c.contacts.clone()),
            get_engagement: GetEngagement::new(c.engagements.clone()),
            get_engagements: GetEngagements::new(c.engagements.clone()),
            get_services: GetServices::new(c.services.clone()),
            get_service: GetService::new(c.services.clone()),
            get_service_answers: GetServiceAnswers::new(
                c.services.clone(),
                c.service_answers.clone(),
            ),
            get_tags: GetTags::new(c.organizations.clone(), c.tags.clone()),
            service_entry_tag_counter: ServiceEntryTagCounter::new(
                c.services.clone(),
                c.service_answers.clone(),
            ),
            engagement_tag_counter: EngagementTagCounter::new(c.engagements.clone()),

            organization_tags: OrganizationTags::new(c.tags.clone()),
            organization_contacts: OrganizationContacts::new(c.contacts.clone()),
            organization_users: OrganizationUsers::new(c.users.clone()),
            contact_tags: ContactTags::new(c.tags.clone()),
            contact_engagements: ContactEngagements::new(c.engagements.clone()),
            engagement_user: EngagementUser::new(c.users.clone()),
            engagement_contacts: EngagementContacts::new(c.contacts.clone()),
            engagement_tags: EngagementTags::new(c.tags.clone()),
            service_tags: ServiceTags::new(c.tags.clone()),
            service_answer_count: ServiceAnswerCount::new(c.service_answers.clone()),
            service_answer_contacts: ServiceAnswerContacts::new(c.contacts.clone()),
            mention_engagement: MentionEngagement::new(c.engagements.clone()),
            mention_created_by: MentionCreatedBy::new(c.users.clone()),
            mention_tagged_user: MentionTaggedUser::new(c.users.clone()),

            create_organization: CreateOrganization::new(c.organizations.clone(), c.users.clone()),
            add_member: AddMember::new(c.organizations.clone(), c.users.clone()),
            create_contact: CreateContact::new(c.contacts.clone(), c.organizations.clone()),
            update_contact: UpdateContact::new(c.contacts.clone()),
            create_engagement: CreateEngagement::new(
                c.engagements.clone(),
                c.contacts.clone(),
                c.users.clone(),
                publisher.clone(),
            ),
            update_engagement: UpdateEngagement::new(
                c.engagements.clone(),
                c.contacts.clone(),
                c.users.clone(),
                publisher.clone(),
            ),
            create_service: CreateService::new(c.services.clone()),
            create_service_answer: CreateServiceAnswer::new(
                c.services.clone(),
                c.service_answers.clone(),
                c.contacts.clone(),
            ),
            create_tag: CreateTag::new(c.organizations.clone(), c.tags.clone()),
            create_mention: CreateMention::new(
                c.engagements.clone(),
                c.users.clone(),
                publisher.clone(),
            ),

            engagement_updates: EngagementUpdates::new(publisher.clone()),
            mentions: Mentions::new(publisher.clone()),
        }
    }
}
