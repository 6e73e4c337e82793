//! GraphQL schema
//!
//! Every root field and nested object field is bound to exactly one
//! interactor:
//! - [`QueryRoot`]: reads, including the tag counters
//! - [`MutationRoot`]: creates and updates
//! - [`SubscriptionRoot`]: engagement updates and mentions
//!
//! The nested fields of each object type live in `types`.

mod mutation;
mod query;
mod subscription;
mod types;

pub use mutation::MutationRoot;
pub use query::QueryRoot;
pub use subscription::SubscriptionRoot;

use async_graphql::{Context, ErrorExtensions, Schema};
use std::sync::Arc;

use crate::context::RequestContext;
use crate::interactors::Interactors;
use crate::types::CaseworkError;

/// Deepest query accepted
pub const MAX_QUERY_DEPTH: usize = 12;

pub type CaseworkSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

/// Build the schema around an assembled interactor set
pub fn build_schema(interactors: Arc<Interactors>) -> CaseworkSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(interactors)
        .limit_depth(MAX_QUERY_DEPTH)
        .finish()
}

/// Interactors and the request context attached to the current operation
pub(crate) fn wiring<'c>(
    ctx: &Context<'c>,
) -> async_graphql::Result<(&'c Interactors, &'c RequestContext)> {
    let interactors = ctx.data::<Arc<Interactors>>()?;
    let request = ctx.data::<RequestContext>()?;
    Ok((interactors.as_ref(), request))
}

/// Stable machine-readable code for a field error
pub fn error_code(err: &CaseworkError) -> &'static str {
    match err {
        CaseworkError::BadRequest(_) | CaseworkError::Http(_) => "BAD_USER_INPUT",
        CaseworkError::Unauthorized(_) | CaseworkError::Auth(_) => "UNAUTHENTICATED",
        CaseworkError::Forbidden(_) => "FORBIDDEN",
        CaseworkError::NotFound(_) => "NOT_FOUND",
        CaseworkError::Conflict(_) => "CONFLICT",
        CaseworkError::MissingReference { .. } => "MISSING_REFERENCE",
        CaseworkError::Database(_) => "DATABASE_ERROR",
        CaseworkError::Internal(_) | CaseworkError::Config(_) => "INTERNAL_SERVER_ERROR",
    }
}

impl ErrorExtensions for CaseworkError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", error_code(self)))
    }
}

/// Convert an interactor result into a field result
pub(crate) fn gql<T>(result: crate::types::Result<T>) -> async_graphql::Result<T> {
    result.map_err(|e| e.extend())
}
