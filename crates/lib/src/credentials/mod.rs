//! Credential validation and login.
//!
//! Users live in a `users` table on the configured auth connection, keyed
//! by NIP, with Argon2id password hashes. [`CredentialValidator`] checks a
//! NIP/password pair against it; [`Authenticator`] turns a successful check
//! into a stored session.

pub mod crypto;
mod errors;
pub mod schema;

use std::net::IpAddr;

use sqlx::{Row, any::AnyRow};

pub use errors::{CredentialError, LoginError};

use crate::{
    auth::{AuthContext, IpFamily, client_ip},
    registry::ConnectionHandle,
    session::{SESSION_TTL, SessionStore, SessionToken},
};

/// Identity fields of a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: String,
    pub name: String,
    pub role: String,
    pub nip: String,
    pub department_id: String,
    pub title: String,
}

impl UserRecord {
    /// Session context for this user logging in from `client`.
    pub fn into_context(self, client: IpAddr) -> AuthContext {
        AuthContext {
            user_id: self.user_id,
            name: self.name,
            role: self.role,
            nip: self.nip,
            department_id: self.department_id,
            title: self.title,
            ip: client_ip(&client),
            ip_family: IpFamily::of(&client),
        }
    }

    fn from_row(row: &AnyRow) -> Result<(Self, String), sqlx::Error> {
        let user = UserRecord {
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            role: row.try_get("role")?,
            nip: row.try_get("nip")?,
            department_id: row.try_get("department_id")?,
            title: row.try_get("jabatan")?,
        };
        let password_hash: String = row.try_get("password_hash")?;
        Ok((user, password_hash))
    }
}

/// A user to be added to the directory.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: String,
    pub nip: String,
    pub name: String,
    pub role: String,
    pub title: String,
    pub department_id: String,
}

/// Checks NIP/password pairs against the user directory.
#[derive(Clone, Debug)]
pub struct CredentialValidator {
    connection: ConnectionHandle,
}

impl CredentialValidator {
    pub fn new(connection: ConnectionHandle) -> Self {
        Self { connection }
    }

    /// Look up `nip` and verify `password` against its stored hash.
    ///
    /// Unknown NIPs, wrong passwords and unusable stored hashes all return
    /// [`LoginError::InvalidCredentials`]. Directory failures return
    /// [`LoginError::StoreUnavailable`].
    pub async fn validate(&self, nip: &str, password: &str) -> Result<UserRecord, LoginError> {
        let row = self
            .connection
            .run(
                "credential lookup",
                sqlx::query(schema::SELECT_USER_BY_NIP)
                    .bind(nip)
                    .fetch_optional(self.connection.pool()),
            )
            .await
            .map_err(|e| {
                tracing::error!("User directory unavailable: {e}");
                LoginError::StoreUnavailable
            })?;

        let Some(row) = row else {
            // Same Argon2 work as a wrong password for a known NIP
            let _ = crypto::verify_password_blocking(
                password.to_string(),
                crypto::DUMMY_HASH.to_string(),
            )
            .await;
            tracing::debug!("Login rejected: unknown NIP");
            return Err(LoginError::InvalidCredentials);
        };

        let (user, password_hash) = UserRecord::from_row(&row).map_err(|e| {
            tracing::error!("User row could not be decoded: {e}");
            LoginError::StoreUnavailable
        })?;

        match crypto::verify_password_blocking(password.to_string(), password_hash).await {
            Ok(()) => Ok(user),
            Err(CredentialError::PasswordMismatch) => {
                tracing::debug!(user_id = %user.user_id, "Login rejected: wrong password");
                Err(LoginError::InvalidCredentials)
            }
            Err(CredentialError::MalformedHash) => {
                tracing::error!(user_id = %user.user_id, "Stored password hash is malformed");
                Err(LoginError::InvalidCredentials)
            }
            Err(e) => {
                tracing::error!("Password verification failed: {e}");
                Err(LoginError::StoreUnavailable)
            }
        }
    }

    /// Add `user` with a freshly hashed `password`.
    pub async fn create_user(&self, user: &NewUser, password: &str) -> Result<(), CredentialError> {
        let existing = self
            .connection
            .run(
                "user lookup",
                sqlx::query(schema::SELECT_USER_BY_NIP)
                    .bind(user.nip.as_str())
                    .fetch_optional(self.connection.pool()),
            )
            .await?;
        if existing.is_some() {
            return Err(CredentialError::DuplicateNip {
                nip: user.nip.clone(),
            });
        }

        let password_hash = crypto::hash_password_blocking(password.to_string()).await?;
        let result = self
            .connection
            .run(
                "insert user",
                sqlx::query(schema::INSERT_USER)
                    .bind(user.user_id.as_str())
                    .bind(user.nip.as_str())
                    .bind(user.name.as_str())
                    .bind(user.role.as_str())
                    .bind(user.title.as_str())
                    .bind(user.department_id.as_str())
                    .bind(password_hash.as_str())
                    .execute(self.connection.pool()),
            )
            .await;

        match result {
            Ok(_) => {
                tracing::info!(user_id = %user.user_id, "Created user");
                Ok(())
            }
            Err(crate::registry::ConnectionError::Query {
                source: sqlx::Error::Database(db),
                ..
            }) if db.is_unique_violation() => Err(CredentialError::DuplicateNip {
                nip: user.nip.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Login: credential check followed by session creation.
#[derive(Clone, Debug)]
pub struct Authenticator {
    validator: CredentialValidator,
    sessions: SessionStore,
}

impl Authenticator {
    pub fn new(validator: CredentialValidator, sessions: SessionStore) -> Self {
        Self {
            validator,
            sessions,
        }
    }

    pub fn validator(&self) -> &CredentialValidator {
        &self.validator
    }

    /// Validate credentials and open a session for a client at `client`.
    ///
    /// Nothing is written to the session store unless the credentials check
    /// out.
    pub async fn login(
        &self,
        nip: &str,
        password: &str,
        client: IpAddr,
    ) -> Result<(SessionToken, AuthContext), LoginError> {
        let user = self.validator.validate(nip, password).await?;
        let context = user.into_context(client);

        let token = self
            .sessions
            .create(&context, SESSION_TTL)
            .await
            .map_err(|e| {
                tracing::warn!(user_id = %context.user_id, "Could not store session: {e}");
                LoginError::StoreUnavailable
            })?;

        tracing::info!(user_id = %context.user_id, ip = %context.ip, "Login succeeded");
        Ok((token, context))
    }
}
