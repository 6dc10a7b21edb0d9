use crate::infrastructure::error::InfraError;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hashes `password` into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, InfraError> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|error| InfraError::Password(error.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|error| InfraError::Password(error.to_string()))
}

/// `Ok(false)` for a wrong password; `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, InfraError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|error| InfraError::Password(error.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(error) => Err(InfraError::Password(error.to_string())),
    }
}
