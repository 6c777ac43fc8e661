//!
//! Watcher: session and connection management for an internal document and
//! tax-record web service.
//!
//! ## Core Concepts
//!
//! * **Connection registry (`registry::ConnectionRegistry`)**: Named relational
//!   connection pools, provisioned and verified once at startup.
//! * **Key-value store (`kv::KvStore`)**: TTL-capable storage for session
//!   records, backed by Redis or an in-process map.
//! * **Sessions (`session::SessionStore`)**: Opaque tokens mapped to a
//!   serialized `auth::AuthContext` with a fixed 24h lifetime.
//! * **Authentication (`auth`)**: Resolves the `session_token` cookie to an
//!   identity and gates protected routes.
//! * **Credentials (`credentials`)**: Argon2 password verification against
//!   the user directory, and login.
//! * **Server (`server`)**: The axum router, shared state and handlers.

pub mod auth;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod kv;
pub mod maintenance;
pub mod registry;
pub mod server;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};

/// Result type used throughout the Watcher library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Watcher library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structured configuration errors from the config module
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    /// Structured connection errors from the registry module
    #[error(transparent)]
    Connection(#[from] registry::ConnectionError),

    /// Structured key-value errors from the kv module
    #[error(transparent)]
    Kv(#[from] kv::KvError),

    /// Structured session store errors from the session module
    #[error(transparent)]
    Store(#[from] session::StoreError),

    /// Structured request authentication errors from the auth module
    #[error(transparent)]
    Auth(#[from] auth::AuthError),

    /// Login failures from the credentials module
    #[error(transparent)]
    Login(#[from] credentials::LoginError),

    /// Password and user administration errors from the credentials module
    #[error(transparent)]
    Credential(#[from] credentials::CredentialError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Config(_) => "config",
            Error::Connection(_) => "registry",
            Error::Kv(_) => "kv",
            Error::Store(_) => "session",
            Error::Auth(_) => "auth",
            Error::Login(_) | Error::Credential(_) => "credentials",
        }
    }

    /// Check if this error indicates a backend could not be reached.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Connection(e) => e.is_unreachable(),
            Error::Kv(_) => true,
            Error::Store(e) => e.is_unavailable(),
            Error::Auth(e) => e.is_store_unavailable(),
            Error::Login(e) => e.is_store_unavailable(),
            _ => false,
        }
    }

    /// Check if this error is authentication-related.
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, Error::Auth(_) | Error::Login(_))
    }

    /// Check if this error is configuration-related.
    pub fn is_config_error(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::Connection(e) => e.is_not_configured(),
            _ => false,
        }
    }
}
