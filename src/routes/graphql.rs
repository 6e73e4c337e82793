//! GraphQL over HTTP
//!
//! - POST /graphql: JSON body, single request or batch
//! - GET /graphql?query=...&variables=...&operationName=...: queries only
//! - GET /graphiql: GraphiQL page (dev mode only)
//!
//! The bearer token is resolved to a request context before execution; an
//! invalid or revoked token is rejected with 401 instead of running the
//! operation anonymously.

use async_graphql::http::GraphiQLSource;
use async_graphql::parser::types::OperationType;
use async_graphql::{BatchRequest, Variables};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::graphql::error_code;
use crate::server::http::{json_response, to_boxed, with_cors};
use crate::server::{AppState, BoxBody};
use crate::types::CaseworkError;

/// Query string of a GET request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLQueryParams {
    pub query: String,
    pub operation_name: Option<String>,
    /// JSON-encoded variables object
    pub variables: Option<String>,
}

impl GraphQLQueryParams {
    pub fn parse(query_string: &str) -> Result<Self, CaseworkError> {
        serde_urlencoded::from_str(query_string)
            .map_err(|e| CaseworkError::BadRequest(format!("Invalid query string: {}", e)))
    }

    /// Build the request, rejecting mutations
    pub fn into_request(self) -> Result<async_graphql::Request, CaseworkError> {
        let document = async_graphql::parser::parse_query(&self.query)
            .map_err(|e| CaseworkError::BadRequest(e.to_string()))?;
        let has_mutation = document
            .operations
            .iter()
            .any(|(_, op)| op.node.ty == OperationType::Mutation);
        if has_mutation {
            return Err(CaseworkError::BadRequest(
                "Mutations must be sent with POST".into(),
            ));
        }

        let mut request = async_graphql::Request::new(self.query);
        if let Some(name) = self.operation_name {
            request = request.operation_name(name);
        }
        if let Some(raw) = self.variables.filter(|v| !v.is_empty()) {
            let value: serde_json::Value = serde_json::from_str(&raw)?;
            request = request.variables(Variables::from_json(value));
        }
        Ok(request)
    }
}

/// GraphQL-shaped error body for failures outside execution
fn error_body(err: &CaseworkError) -> String {
    serde_json::json!({
        "errors": [{
            "message": err.to_string(),
            "extensions": { "code": error_code(err) }
        }]
    })
    .to_string()
}

fn error_response(err: CaseworkError) -> Response<BoxBody> {
    let body = error_body(&err);
    to_boxed(json_response(err.status_code(), body))
}

fn get_auth_header(req: &Request<Incoming>) -> Option<String> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn read_body(req: Request<Incoming>, limit: usize) -> Result<Bytes, CaseworkError> {
    let body = Limited::new(req.into_body(), limit)
        .collect()
        .await
        .map_err(|e| CaseworkError::BadRequest(format!("Failed to read body: {}", e)))?;
    Ok(body.to_bytes())
}

/// Resolve the caller and run the batch
async fn execute(
    state: &AppState,
    auth_header: Option<String>,
    batch: BatchRequest,
) -> Response<BoxBody> {
    let ctx = match state.contexts.from_header(auth_header.as_deref()).await {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!("Rejected GraphQL request: {}", e);
            return error_response(e);
        }
    };

    let request_id = ctx.request_id.clone();
    let response = state.schema.execute_batch(batch.data(ctx)).await;
    if !response.is_ok() {
        debug!(request_id = %request_id, "GraphQL response carries errors");
    }

    match serde_json::to_string(&response) {
        Ok(body) => to_boxed(json_response(StatusCode::OK, body)),
        Err(e) => error_response(CaseworkError::Internal(format!(
            "Failed to encode response: {}",
            e
        ))),
    }
}

/// POST /graphql
pub async fn handle_graphql_post(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);

    let bytes = match read_body(req, state.args.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => return error_response(e),
    };

    let batch: BatchRequest = match serde_json::from_slice(&bytes) {
        Ok(batch) => batch,
        Err(e) => return error_response(e.into()),
    };

    execute(&state, auth_header, batch).await
}

/// GET /graphql
pub async fn handle_graphql_get(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let query_string = req.uri().query().unwrap_or("");

    let request = match GraphQLQueryParams::parse(query_string).and_then(|p| p.into_request()) {
        Ok(request) => request,
        Err(e) => return error_response(e),
    };

    execute(&state, auth_header, BatchRequest::Single(request)).await
}

/// GET /graphiql
pub fn graphiql_page() -> Response<Full<Bytes>> {
    let html = GraphiQLSource::build()
        .endpoint("/graphql")
        .subscription_endpoint("/graphql")
        .finish();

    let mut response = with_cors(Response::new(Full::new(Bytes::from(html))));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_params_with_variables() {
        let params = GraphQLQueryParams::parse(
            "query=query%20Q(%24id%3A%20ID!)%7BgetContact(id%3A%24id)%7Bname%7D%7D&operationName=Q&variables=%7B%22id%22%3A%22abc%22%7D",
        )
        .unwrap();
        assert_eq!(params.operation_name.as_deref(), Some("Q"));
        assert!(params.into_request().is_ok());
    }

    #[test]
    fn test_get_rejects_mutation() {
        let params = GraphQLQueryParams {
            query: "mutation { createTag(input: {}) { id } }".into(),
            operation_name: None,
            variables: None,
        };
        assert!(matches!(
            params.into_request(),
            Err(CaseworkError::BadRequest(_))
        ));
    }

    #[test]
    fn test_get_requires_query() {
        assert!(GraphQLQueryParams::parse("operationName=Q").is_err());
    }

    #[test]
    fn test_error_body_carries_code() {
        let body = error_body(&CaseworkError::Unauthorized("Token has been revoked".into()));
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");
    }
}
