//! Credential routes and bearer token handling
//!
//! Drives the auth operations behind `/auth/*` against an in-memory
//! application state.

use clap::Parser;
use tokio_test::{assert_err, assert_ok};

use casework::auth::{extract_token_from_header, JwtValidator};
use casework::config::{Args, StorageBackend};
use casework::db::Collections;
use casework::routes::auth_routes::{current_user, login, logout, register, LoginRequest, RegisterRequest};
use casework::routes::health::HealthResponse;
use casework::{AppState, CaseworkError};

fn state() -> AppState {
    let args = Args::try_parse_from(["casework", "--dev-mode", "--storage", "memory"]).unwrap();
    AppState::new(
        args,
        StorageBackend::Memory,
        Collections::in_memory(),
        JwtValidator::new_dev(),
    )
}

fn registration(username: &str) -> RegisterRequest {
    RegisterRequest {
        name: "Dana Reyes".into(),
        username: username.into(),
        email: Some("dana@example.org".into()),
        password: "correct horse battery".into(),
    }
}

// =============================================================================
// Bearer extraction
// =============================================================================

#[test]
fn test_bearer_extraction() {
    assert_eq!(extract_token_from_header(Some("Bearer abc123")), Some("abc123"));
    assert_eq!(extract_token_from_header(Some("bearer abc123")), Some("abc123"));
    assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    assert_eq!(extract_token_from_header(Some("Bearer ")), None);
    assert_eq!(extract_token_from_header(None), None);
}

// =============================================================================
// Register / login / me / logout
// =============================================================================

#[tokio::test]
async fn test_register_then_me() {
    let state = state();
    let auth = register(&state, registration("DReyes")).await.unwrap();

    assert_eq!(auth.user.username, "dreyes");
    assert_eq!(auth.expires_in, 3600);
    assert!(auth.user.roles.is_empty());

    let header = format!("Bearer {}", auth.token);
    let me = current_user(&state, Some(&header)).await.unwrap();
    assert_eq!(me.id, auth.user.id);
    assert_eq!(me.email.as_deref(), Some("dana@example.org"));
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let state = state();
    assert_ok!(register(&state, registration("dreyes")).await);

    let err = assert_err!(register(&state, registration("dreyes")).await);
    assert!(matches!(err, CaseworkError::Conflict(_)));
}

#[tokio::test]
async fn test_short_password_rejected() {
    let state = state();
    let mut request = registration("dreyes");
    request.password = "short".into();

    let err = register(&state, request).await.unwrap_err();
    assert!(matches!(err, CaseworkError::BadRequest(_)));
}

#[tokio::test]
async fn test_login_checks_password() {
    let state = state();
    register(&state, registration("dreyes")).await.unwrap();

    let ok = login(
        &state,
        LoginRequest {
            username: "dreyes".into(),
            password: "correct horse battery".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(ok.user.username, "dreyes");

    let wrong = login(
        &state,
        LoginRequest {
            username: "dreyes".into(),
            password: "wrong password".into(),
        },
    )
    .await
    .unwrap_err();
    let unknown = login(
        &state,
        LoginRequest {
            username: "nobody".into(),
            password: "correct horse battery".into(),
        },
    )
    .await
    .unwrap_err();

    // Same message either way
    assert_eq!(wrong.to_string(), unknown.to_string());
    assert!(matches!(wrong, CaseworkError::Unauthorized(_)));
}

#[tokio::test]
async fn test_logout_revokes_issued_tokens() {
    let state = state();
    let auth = register(&state, registration("dreyes")).await.unwrap();
    let header = format!("Bearer {}", auth.token);

    logout(&state, Some(&header)).await.unwrap();

    let err = current_user(&state, Some(&header)).await.unwrap_err();
    assert!(matches!(err, CaseworkError::Unauthorized(_)));

    // A fresh login carries the new version
    let again = login(
        &state,
        LoginRequest {
            username: "dreyes".into(),
            password: "correct horse battery".into(),
        },
    )
    .await
    .unwrap();
    let header = format!("Bearer {}", again.token);
    assert_ok!(current_user(&state, Some(&header)).await);
}

#[tokio::test]
async fn test_me_requires_token() {
    let state = state();
    let err = current_user(&state, None).await.unwrap_err();
    assert!(matches!(err, CaseworkError::Unauthorized(_)));
}

// =============================================================================
// Health
// =============================================================================

#[test]
fn test_health_reports_storage_and_channels() {
    let state = state();
    let _updates = state.publisher.subscribe("ENGAGEMENT_UPDATE.x");

    let health = HealthResponse::from_state(&state);
    assert_eq!(health.status, "ok");
    assert_eq!(health.storage, "memory");
    assert_eq!(health.active_channels, 1);
    assert_eq!(health.mode, "development");
    assert!(!health.revision.is_empty());
}
