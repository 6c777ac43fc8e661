//! Session store error types.

use thiserror::Error;

use crate::kv::KvError;

/// Errors from [`SessionStore`](super::SessionStore) operations.
///
/// `NotFound` covers both tokens that were never issued and records whose
/// TTL has elapsed; the backing store does not distinguish the two.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// No live record exists under the token.
    #[error("Session not found")]
    NotFound,

    /// The key-value backend failed or timed out.
    #[error("Session store unavailable")]
    Unavailable {
        #[source]
        source: KvError,
    },

    /// A record exists but is not a well-formed session.
    #[error("Session record is malformed")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, StoreError::Malformed { .. })
    }
}

impl From<KvError> for StoreError {
    fn from(source: KvError) -> Self {
        StoreError::Unavailable { source }
    }
}
