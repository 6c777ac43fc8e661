//! Session persistence.
//!
//! A session is an [`AuthContext`] serialized as JSON and stored in the
//! key-value backend under an opaque [`SessionToken`] with a fixed TTL.
//! Records are written once and never refreshed; a session ends when its TTL
//! elapses or when it is destroyed on logout.

mod errors;

use std::{fmt, sync::Arc, time::Duration};

use rand::{RngCore, rngs::OsRng};

pub use errors::StoreError;

use crate::{auth::AuthContext, kv::KvStore};

/// Lifetime of a freshly created session.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Number of random bytes behind each token (hex encoded to twice as many chars).
pub const TOKEN_BYTES: usize = 16;

/// Opaque bearer token naming a session.
///
/// Generated from the OS random source, so tokens carry no user data and
/// cannot be predicted from earlier ones. `Debug` shows only a short prefix.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.0.get(..6).unwrap_or(&self.0);
        write!(f, "SessionToken({prefix}..)")
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}

/// Token-keyed store of [`AuthContext`] records.
///
/// Cheap to clone; clones share the same backend.
#[derive(Clone, Debug)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// The backend, for health checks.
    pub fn kv(&self) -> &Arc<dyn KvStore> {
        &self.kv
    }

    /// Persist `context` under a fresh token that expires after `ttl`.
    ///
    /// The record and its expiry are written in one backend call, so a
    /// failure never leaves a session without a TTL.
    pub async fn create(
        &self,
        context: &AuthContext,
        ttl: Duration,
    ) -> Result<SessionToken, StoreError> {
        let record =
            serde_json::to_string(context).map_err(|source| StoreError::Malformed { source })?;
        let token = SessionToken::generate();
        self.kv.set_with_ttl(token.as_str(), &record, ttl).await?;
        tracing::debug!(user_id = %context.user_id, ttl_secs = ttl.as_secs(), "Created session");
        Ok(token)
    }

    /// Load the context stored under `token`.
    ///
    /// Read-only: the record's TTL is left untouched.
    pub async fn resolve(&self, token: &str) -> Result<AuthContext, StoreError> {
        let Some(record) = self.kv.get(token).await? else {
            return Err(StoreError::NotFound);
        };
        serde_json::from_str(&record).map_err(|source| StoreError::Malformed { source })
    }

    /// Remove the session under `token`. Idempotent.
    pub async fn destroy(&self, token: &str) -> Result<(), StoreError> {
        if self.kv.delete(token).await? {
            tracing::debug!("Destroyed session");
        }
        Ok(())
    }
}
