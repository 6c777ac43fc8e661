//! Password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings, which embed the algorithm parameters
//! and salt, so verification needs nothing but the stored string.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core},
};

use super::errors::CredentialError;

/// Well-formed hash with the default cost parameters that matches no password.
///
/// Verified against when a NIP is unknown, so both rejection paths cost one
/// Argon2 run.
pub(crate) const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$Ryrw+Apr0m7hzJpOEEUWIA$fby9a51DLyamjuDQ8HAlOUcFSNdBZaAZcveoCFw40GY";

/// Hash a password using Argon2id
///
/// # Returns
/// The Argon2 hash string (PHC format)
pub fn hash_password(password: impl AsRef<str>) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut rand_core::OsRng);

    Argon2::default()
        .hash_password(password.as_ref().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::HashingFailed {
            reason: e.to_string(),
        })
}

/// Verify a password against its stored hash
///
/// # Returns
/// Ok(()) if the password is correct, [`CredentialError::PasswordMismatch`]
/// if not, [`CredentialError::MalformedHash`] if the stored hash is unusable.
pub fn verify_password(
    password: impl AsRef<str>,
    password_hash: impl AsRef<str>,
) -> Result<(), CredentialError> {
    let parsed_hash =
        PasswordHash::new(password_hash.as_ref()).map_err(|_| CredentialError::MalformedHash)?;

    Argon2::default()
        .verify_password(password.as_ref().as_bytes(), &parsed_hash)
        .map_err(|_| CredentialError::PasswordMismatch)
}

/// Run [`hash_password`] off the async executor.
pub async fn hash_password_blocking(password: String) -> Result<String, CredentialError> {
    tokio::task::spawn_blocking(move || hash_password(password))
        .await
        .map_err(|e| CredentialError::TaskFailed {
            reason: e.to_string(),
        })?
}

/// Run [`verify_password`] off the async executor.
pub async fn verify_password_blocking(
    password: String,
    password_hash: String,
) -> Result<(), CredentialError> {
    tokio::task::spawn_blocking(move || verify_password(password, password_hash))
        .await
        .map_err(|e| CredentialError::TaskFailed {
            reason: e.to_string(),
        })?
}
