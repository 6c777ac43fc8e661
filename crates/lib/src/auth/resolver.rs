use tower_cookies::Cookies;

use super::{AuthContext, AuthError, SESSION_COOKIE};
use crate::session::{SessionStore, StoreError};

/// Maps a request's session cookie to an [`AuthContext`].
#[derive(Clone, Debug)]
pub struct AuthResolver {
    sessions: SessionStore,
}

impl AuthResolver {
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }

    /// Resolve the `session_token` cookie carried by a request.
    pub async fn resolve(&self, cookies: &Cookies) -> Result<AuthContext, AuthError> {
        let token = cookies.get(SESSION_COOKIE);
        self.resolve_token(token.as_ref().map(|c| c.value())).await
    }

    /// Resolve a raw token value as presented by a client.
    ///
    /// Read-only; resolving never extends the session.
    pub async fn resolve_token(&self, token: Option<&str>) -> Result<AuthContext, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        match self.sessions.resolve(token).await {
            Ok(context) => Ok(context),
            Err(StoreError::NotFound) => Err(AuthError::InvalidSession),
            Err(StoreError::Unavailable { source }) => {
                tracing::warn!("Session lookup failed: {source}");
                Err(AuthError::StoreUnavailable)
            }
            Err(StoreError::Malformed { source }) => {
                tracing::error!("Stored session record does not parse, possible corruption: {source}");
                Err(AuthError::StoreUnavailable)
            }
        }
    }
}
