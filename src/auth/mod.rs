//! Authentication and authorization for casework
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - Org-scoped roles and the caller identity built from them

pub mod jwt;
pub mod password;
pub mod permissions;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use password::{hash_password, verify_password};
pub use permissions::{Identity, PermissionLevel, Role};
