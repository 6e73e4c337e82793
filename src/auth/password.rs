//! Password hashing and verification using Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::CaseworkError;

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String, CaseworkError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CaseworkError::Auth(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored PHC string
///
/// A malformed stored hash is an error; a wrong password is `Ok(false)`.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CaseworkError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| CaseworkError::Auth(format!("Invalid password hash format: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CaseworkError::Auth(format!("Password verification failed: {e}"))),
    }
}
