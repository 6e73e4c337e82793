//! Error types for casework
//!
//! Authorization denial is never an error here: interactors return an
//! empty list or `None` for callers outside the owning organization.

use hyper::StatusCode;

/// Main error type for casework operations
#[derive(Debug, thiserror::Error)]
pub enum CaseworkError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored reference points at a document that no longer exists
    #[error("Referenced {collection} not found: {id}")]
    MissingReference { collection: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),
}

impl CaseworkError {
    /// Shorthand for a missing required reference
    pub fn missing(collection: &'static str, id: impl ToString) -> Self {
        Self::MissingReference {
            collection,
            id: id.to_string(),
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) | Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::MissingReference { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        (self.status_code(), self.to_string())
    }
}

impl From<std::io::Error> for CaseworkError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for CaseworkError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for CaseworkError {
    fn from(err: hyper::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<mongodb::error::Error> for CaseworkError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for CaseworkError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Internal(format!("BSON encode error: {}", err))
    }
}

impl From<bson::de::Error> for CaseworkError {
    fn from(err: bson::de::Error) -> Self {
        Self::Database(format!("BSON decode error: {}", err))
    }
}

impl From<bson::oid::Error> for CaseworkError {
    fn from(err: bson::oid::Error) -> Self {
        Self::BadRequest(format!("Malformed id: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for CaseworkError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

/// Result type alias for casework operations
pub type Result<T> = std::result::Result<T, CaseworkError>;
