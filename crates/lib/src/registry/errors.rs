//! Error types for the connection registry.

use thiserror::Error;

/// Errors raised while provisioning or using named relational connections.
///
/// `Unreachable` and `BootstrapFailed` during [`initialize`] are fatal to
/// process start. On the request path they are mapped to a generic 5xx.
///
/// [`initialize`]: super::ConnectionRegistry::initialize
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The server could not be reached, or a call exceeded its timeout.
    #[error("Database '{name}' unreachable: {reason}")]
    Unreachable {
        name: String,
        reason: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// The server was reached but the target database could not be prepared.
    #[error("Bootstrap of database '{name}' failed: {reason}")]
    BootstrapFailed {
        name: String,
        reason: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// `get` was called with a name absent from configuration.
    #[error("No database connection configured under '{name}'")]
    NotConfigured { name: String },

    /// A statement issued through a live handle failed.
    #[error("{operation} on '{name}' failed")]
    Query {
        name: String,
        operation: String,
        #[source]
        source: sqlx::Error,
    },
}

impl ConnectionError {
    /// Name of the logical connection this error concerns.
    pub fn connection_name(&self) -> &str {
        match self {
            ConnectionError::Unreachable { name, .. }
            | ConnectionError::BootstrapFailed { name, .. }
            | ConnectionError::NotConfigured { name }
            | ConnectionError::Query { name, .. } => name,
        }
    }

    /// Check if this error is a caller/configuration mismatch.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, ConnectionError::NotConfigured { .. })
    }

    /// Check if the backend is unreachable or timed out.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ConnectionError::Unreachable { .. })
    }
}

/// Extension trait for sqlx results to attach the connection name and a
/// context message.
pub(crate) trait SqlxResultExt<T> {
    fn unreachable(self, name: &str, context: &str) -> Result<T, ConnectionError>;
    fn bootstrap_failed(self, name: &str, context: &str) -> Result<T, ConnectionError>;
}

impl<T> SqlxResultExt<T> for Result<T, sqlx::Error> {
    fn unreachable(self, name: &str, context: &str) -> Result<T, ConnectionError> {
        self.map_err(|e| ConnectionError::Unreachable {
            name: name.to_string(),
            reason: format!("{context}: {e}"),
            source: Some(e),
        })
    }

    fn bootstrap_failed(self, name: &str, context: &str) -> Result<T, ConnectionError> {
        self.map_err(|e| ConnectionError::BootstrapFailed {
            name: name.to_string(),
            reason: format!("{context}: {e}"),
            source: Some(e),
        })
    }
}
