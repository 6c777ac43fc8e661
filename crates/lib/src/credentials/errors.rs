//! Credential error types.

use thiserror::Error;

use crate::registry::ConnectionError;

/// Outcome of a failed login, as reported to clients.
///
/// Deliberately coarse: an unknown NIP and a wrong password are the same
/// `InvalidCredentials`.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("Invalid NIP or password")]
    InvalidCredentials,

    /// The user directory or the session store could not answer.
    #[error("Login is temporarily unavailable")]
    StoreUnavailable,
}

impl LoginError {
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, LoginError::InvalidCredentials)
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, LoginError::StoreUnavailable)
    }
}

/// Errors from password handling and user administration.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Argon2 could not produce a hash.
    #[error("Password hashing failed: {reason}")]
    HashingFailed { reason: String },

    /// The stored hash is not a valid PHC string.
    #[error("Stored password hash is malformed")]
    MalformedHash,

    /// The password does not match the stored hash.
    #[error("Password does not match")]
    PasswordMismatch,

    /// A user with this NIP already exists.
    #[error("A user with NIP '{nip}' already exists")]
    DuplicateNip { nip: String },

    /// The background hashing task panicked or was cancelled.
    #[error("Password task failed: {reason}")]
    TaskFailed { reason: String },

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl CredentialError {
    pub fn is_password_mismatch(&self) -> bool {
        matches!(self, CredentialError::PasswordMismatch)
    }

    pub fn is_duplicate_nip(&self) -> bool {
        matches!(self, CredentialError::DuplicateNip { .. })
    }
}
