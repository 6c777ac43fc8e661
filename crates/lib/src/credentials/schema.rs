//! User directory schema.
//!
//! Column types are kept to the subset MySQL and SQLite agree on.

use sqlx::Executor;

use crate::registry::{ConnectionError, ConnectionHandle};

pub const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    user_id VARCHAR(64) NOT NULL PRIMARY KEY,
    nip VARCHAR(32) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    role VARCHAR(64) NOT NULL,
    jabatan VARCHAR(255) NOT NULL DEFAULT '',
    department_id VARCHAR(64) NOT NULL DEFAULT '',
    password_hash VARCHAR(255) NOT NULL
)";

pub(crate) const SELECT_USER_BY_NIP: &str = "SELECT user_id, name, role, nip, jabatan, department_id, password_hash \
     FROM users WHERE nip = ?";

pub(crate) const INSERT_USER: &str = "INSERT INTO users \
     (user_id, nip, name, role, jabatan, department_id, password_hash) \
     VALUES (?, ?, ?, ?, ?, ?, ?)";

/// Create the `users` table if it does not exist.
pub async fn ensure_users_table(connection: &ConnectionHandle) -> Result<(), ConnectionError> {
    connection
        .run("create users table", connection.pool().execute(CREATE_USERS_TABLE))
        .await?;
    tracing::debug!(connection = connection.name(), "Users table ready");
    Ok(())
}
