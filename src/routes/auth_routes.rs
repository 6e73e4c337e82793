//! Authentication routes
//!
//! - POST /auth/register: create credentials, returns a token
//! - POST /auth/login: verify credentials, returns a token
//! - POST /auth/logout: bump the token version, revoking every issued token
//! - GET /auth/me: the caller behind the bearer token
//!
//! Organization membership is managed through GraphQL (`createOrganization`,
//! `addMember`), not here.

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, PermissionLevel, TokenInput};
use crate::db::schemas::UserDoc;
use crate::server::http::{json_response, to_boxed};
use crate::server::{AppState, BoxBody};
use crate::types::CaseworkError;

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 8;

/// Largest accepted auth request body
const MAX_AUTH_BODY_BYTES: usize = 10240;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub org_id: String,
    pub permission: PermissionLevel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub roles: Vec<RoleResponse>,
}

impl From<UserDoc> for UserResponse {
    fn from(user: UserDoc) -> Self {
        Self {
            id: user._id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name,
            username: user.username,
            email: user.email,
            roles: user
                .roles
                .into_iter()
                .map(|r| RoleResponse {
                    org_id: r.org_id.to_hex(),
                    permission: r.permission,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// =============================================================================
// Operations
// =============================================================================

/// Create a user and issue its first token
pub async fn register(state: &AppState, body: RegisterRequest) -> Result<AuthResponse, CaseworkError> {
    let name = body.name.trim().to_string();
    let username = body.username.trim().to_lowercase();

    if name.is_empty() || username.is_empty() || body.password.is_empty() {
        return Err(CaseworkError::BadRequest(
            "Missing required fields: name, username, password".into(),
        ));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(CaseworkError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let users = &state.collections.users;
    if users.user_by_username(&username).await?.is_some() {
        return Err(CaseworkError::Conflict(format!(
            "Username '{}' is already taken",
            username
        )));
    }

    let email = body.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
    let password_hash = hash_password(&body.password)?;
    let user = users
        .insert(UserDoc::new(name, username, email, password_hash))
        .await?;

    info!("Registered user: {}", user.username);
    issue_token(state, user)
}

/// Verify credentials and issue a token
pub async fn login(state: &AppState, body: LoginRequest) -> Result<AuthResponse, CaseworkError> {
    let username = body.username.trim().to_lowercase();
    if username.is_empty() || body.password.is_empty() {
        return Err(CaseworkError::BadRequest(
            "Missing required fields: username, password".into(),
        ));
    }

    // Same error for unknown user and wrong password
    let invalid = || CaseworkError::Unauthorized("Invalid credentials".into());

    let Some(user) = state.collections.users.user_by_username(&username).await? else {
        warn!("Login failed - user not found: {}", username);
        return Err(invalid());
    };

    if !verify_password(&body.password, &user.password_hash)? {
        warn!("Login failed - invalid password: {}", username);
        return Err(invalid());
    }

    info!("Login successful: {}", username);
    issue_token(state, user)
}

/// The user behind an Authorization header
pub async fn current_user(
    state: &AppState,
    auth_header: Option<&str>,
) -> Result<UserResponse, CaseworkError> {
    let ctx = state.contexts.from_header(auth_header).await?;
    let identity = ctx.require_identity()?;

    state
        .collections
        .users
        .item_by_object_id(identity.user_id)
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| CaseworkError::Unauthorized("Unknown user".into()))
}

/// Revoke every token issued to the caller
pub async fn logout(state: &AppState, auth_header: Option<&str>) -> Result<(), CaseworkError> {
    let ctx = state.contexts.from_header(auth_header).await?;
    let identity = ctx.require_identity()?;

    state
        .collections
        .users
        .revoke_tokens(identity.user_id)
        .await?
        .ok_or_else(|| CaseworkError::Unauthorized("Unknown user".into()))?;
    info!("Revoked tokens for {}", identity.username);
    Ok(())
}

fn issue_token(state: &AppState, user: UserDoc) -> Result<AuthResponse, CaseworkError> {
    let jwt = state.contexts.jwt();
    let token = jwt.generate_token(TokenInput {
        user_id: user._id.map(|id| id.to_hex()).unwrap_or_default(),
        username: user.username.clone(),
        version: user.token_version,
    })?;

    Ok(AuthResponse {
        token,
        expires_in: jwt.expiry_seconds(),
        user: user.into(),
    })
}

// =============================================================================
// Response Helpers
// =============================================================================

fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    to_boxed(json_response(status, json))
}

fn error_response(err: CaseworkError) -> Response<BoxBody> {
    let code = match &err {
        CaseworkError::Conflict(_) => Some("USERNAME_TAKEN".to_string()),
        CaseworkError::Unauthorized(_) => Some("UNAUTHORIZED".to_string()),
        _ => None,
    };
    let (status, error) = err.into_status_code_and_body();
    json(status, &ErrorResponse { error, code })
}

/// Read at most `MAX_AUTH_BODY_BYTES` of the body and parse it as JSON
async fn parse_json_body<T, B>(body: B) -> Result<T, CaseworkError>
where
    T: for<'de> Deserialize<'de>,
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = Limited::new(body, MAX_AUTH_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                CaseworkError::Http("Request body too large".into())
            } else {
                CaseworkError::Http(format!("Failed to read body: {}", e))
            }
        })?;

    serde_json::from_slice(&body.to_bytes())
        .map_err(|e| CaseworkError::BadRequest(format!("Invalid JSON: {}", e)))
}

fn get_auth_header(req: &Request<hyper::body::Incoming>) -> Option<String> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /auth/register
async fn handle_register(req: Request<hyper::body::Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: RegisterRequest = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    match register(&state, body).await {
        Ok(auth) => json(StatusCode::CREATED, &auth),
        Err(e) => error_response(e),
    }
}

/// POST /auth/login
async fn handle_login(req: Request<hyper::body::Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req.into_body()).await {
        Ok(b) => b,
        Err(e) => return error_response(e),
    };

    match login(&state, body).await {
        Ok(auth) => json(StatusCode::OK, &auth),
        Err(e) => error_response(e),
    }
}

/// POST /auth/logout
async fn handle_logout(req: Request<hyper::body::Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    match logout(&state, auth_header.as_deref()).await {
        Ok(()) => json(StatusCode::OK, &serde_json::json!({ "success": true })),
        Err(e) => error_response(e),
    }
}

/// GET /auth/me
async fn handle_me(req: Request<hyper::body::Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    match current_user(&state, auth_header.as_deref()).await {
        Ok(user) => json(StatusCode::OK, &user),
        Err(e) => error_response(e),
    }
}

// =============================================================================
// Main Router
// =============================================================================

/// Handle auth-related HTTP requests.
///
/// Returns Some(response) if request was handled, None if not an auth route.
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    if !path.starts_with("/auth") {
        return None;
    }

    let method = req.method().clone();
    let response = match (&method, path.as_str()) {
        (&Method::POST, "/auth/register") => handle_register(req, state).await,
        (&Method::POST, "/auth/login") => handle_login(req, state).await,
        (&Method::POST, "/auth/logout") => handle_logout(req, state).await,
        (&Method::GET, "/auth/me") => handle_me(req, state).await,

        (_, "/auth/register") | (_, "/auth/login") | (_, "/auth/logout") | (_, "/auth/me") => json(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
                code: None,
            },
        ),

        _ => json(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Auth endpoint not found".into(),
                code: None,
            },
        ),
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    #[tokio::test]
    async fn test_parse_json_body_within_limit() {
        let body = Full::new(Bytes::from_static(br#"{"username":"ana","password":"secret-pass"}"#));
        let login: LoginRequest = parse_json_body(body).await.unwrap();
        assert_eq!(login.username, "ana");
    }

    #[tokio::test]
    async fn test_parse_json_body_stops_at_limit() {
        let oversized = Bytes::from(vec![b' '; MAX_AUTH_BODY_BYTES + 1]);
        let err = parse_json_body::<LoginRequest, _>(Full::new(oversized))
            .await
            .unwrap_err();
        assert!(matches!(err, CaseworkError::Http(ref msg) if msg.contains("too large")));
    }

    #[tokio::test]
    async fn test_parse_json_body_rejects_bad_json() {
        let err = parse_json_body::<LoginRequest, _>(Full::new(Bytes::from_static(b"{")))
            .await
            .unwrap_err();
        assert!(matches!(err, CaseworkError::BadRequest(_)));
    }
}
