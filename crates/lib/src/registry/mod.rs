//! Named relational connection registry.
//!
//! The registry is built once at startup from every configured
//! [`ConnectionConfig`] and then shared read-only by all request handlers.
//! A [`ConnectionHandle`] is only handed out after its database has been
//! created if absent and a liveness check has succeeded.
//!
//! ## Architecture
//!
//! Connections use sqlx's `AnyPool` so MySQL deployments and SQLite-backed
//! test or embedded deployments share the same code path. The pool owned by
//! each handle is the only concurrency boundary: handles are cheap clones and
//! there is no checkout/return at this layer.
//!
//! ## Bootstrap sequence (MySQL)
//!
//! 1. Connect to the server without selecting a database
//! 2. `CREATE DATABASE IF NOT EXISTS <database>`
//! 3. Close the bootstrap connection
//! 4. Open the pool scoped to `<database>`
//! 5. Recorder with `SELECT 1`
//!
//! Any failure aborts initialization for the whole registry.

mod errors;

use std::{collections::BTreeMap, fmt, future::Future, path::Path, sync::Arc, time::Duration};

use serde::Deserialize;
use sqlx::{AnyConnection, AnyPool, Connection, Executor, Row, any::AnyPoolOptions};
use url::Url;

pub use errors::ConnectionError;
use errors::SqlxResultExt;

use crate::config::redact_url;

/// SQL dialect / driver of a configured connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// MySQL server (default)
    #[default]
    Mysql,
    /// SQLite file, or `:memory:` for an isolated in-memory database
    Sqlite,
}

/// Database name that selects a private in-memory SQLite database.
pub const SQLITE_MEMORY: &str = ":memory:";

/// Configuration for one logical connection.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Logical name; filled from the config table key.
    #[serde(skip)]
    pub name: String,
    pub driver: Driver,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Target database name (MySQL) or file path (SQLite).
    pub database: String,
    /// Upper bound handed to the driver pool.
    pub max_connections: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            driver: Driver::Mysql,
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: String::new(),
            max_connections: 10,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("name", &self.name)
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl ConnectionConfig {
    /// Isolated in-memory SQLite connection.
    pub fn sqlite_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: Driver::Sqlite,
            database: SQLITE_MEMORY.to_string(),
            ..Self::default()
        }
    }

    /// Server URL without a database selected.
    fn server_url(&self) -> Result<Url, ConnectionError> {
        let invalid = |reason: String| ConnectionError::BootstrapFailed {
            name: self.name.clone(),
            reason,
            source: None,
        };
        let mut url = Url::parse(&format!("mysql://{}:{}", self.host, self.port))
            .map_err(|e| invalid(format!("invalid host/port: {e}")))?;
        url.set_username(&self.user)
            .map_err(|_| invalid("invalid user name".to_string()))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| invalid("invalid password".to_string()))?;
        }
        Ok(url)
    }

    /// URL of the pool scoped to the target database.
    fn database_url(&self) -> Result<String, ConnectionError> {
        match self.driver {
            Driver::Mysql => {
                let mut url = self.server_url()?;
                url.set_path(&format!("/{}", self.database));
                Ok(url.to_string())
            }
            Driver::Sqlite if self.database == SQLITE_MEMORY => {
                // Shared cache so every pooled connection sees the same database;
                // unique name so separate registries never share one.
                let unique_id = uuid::Uuid::new_v4().simple();
                Ok(format!("sqlite:file:mem_{unique_id}?mode=memory&cache=shared"))
            }
            // mode=rwc: read-write-create
            Driver::Sqlite => Ok(format!("sqlite:{}?mode=rwc", self.database)),
        }
    }

    fn is_sqlite_memory(&self) -> bool {
        self.driver == Driver::Sqlite && self.database == SQLITE_MEMORY
    }
}

/// Shared handle to one named, verified connection pool.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    name: Arc<str>,
    driver: Driver,
    pool: AnyPool,
    operation_timeout: Duration,
}

impl ConnectionHandle {
    /// Logical name this handle was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Run one database call under the per-call timeout.
    ///
    /// A timeout is reported as [`ConnectionError::Unreachable`]; a driver
    /// error as [`ConnectionError::Query`].
    pub async fn run<T, F>(&self, operation: &str, call: F) -> Result<T, ConnectionError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.operation_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(ConnectionError::Query {
                name: self.name.to_string(),
                operation: operation.to_string(),
                source,
            }),
            Err(_) => Err(ConnectionError::Unreachable {
                name: self.name.to_string(),
                reason: format!(
                    "{operation} timed out after {}ms",
                    self.operation_timeout.as_millis()
                ),
                source: None,
            }),
        }
    }

    /// Liveness check.
    pub async fn ping(&self) -> Result<(), ConnectionError> {
        self.run("liveness check", sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map(|_| ())
    }

    /// Columns of `table` in declaration order, with their declared types.
    ///
    /// An absent table yields an empty list.
    pub async fn table_columns(&self, table: &str) -> Result<Vec<TableColumn>, ConnectionError> {
        let sql = match self.driver {
            Driver::Mysql => MYSQL_TABLE_COLUMNS,
            Driver::Sqlite => SQLITE_TABLE_COLUMNS,
        };
        let rows = self
            .run(
                "column lookup",
                sqlx::query(sql).bind(table).fetch_all(&self.pool),
            )
            .await?;

        rows.iter()
            .map(|row| -> Result<TableColumn, sqlx::Error> {
                Ok(TableColumn {
                    name: row.try_get("column_name")?,
                    declared_type: row
                        .try_get::<Option<String>, _>("column_type")?
                        .unwrap_or_default()
                        .to_ascii_lowercase(),
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|source| ConnectionError::Query {
                name: self.name.to_string(),
                operation: "column lookup".to_string(),
                source,
            })
    }
}

const MYSQL_TABLE_COLUMNS: &str = "SELECT CAST(COLUMN_NAME AS CHAR) AS column_name, \
     CAST(COLUMN_TYPE AS CHAR) AS column_type \
     FROM information_schema.COLUMNS \
     WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
     ORDER BY ORDINAL_POSITION";

const SQLITE_TABLE_COLUMNS: &str =
    "SELECT name AS column_name, type AS column_type FROM pragma_table_info(?) ORDER BY cid";

/// One column as reported by the database catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    /// Declared type, lowercased (`varchar(15)`, `bigint unsigned`, `date`).
    pub declared_type: String,
}

/// Mapping from logical database name to a live, verified connection.
#[derive(Clone, Debug, Default)]
pub struct ConnectionRegistry {
    connections: Arc<BTreeMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Provision every configured connection, in order, failing fast.
    ///
    /// `connect_timeout` bounds each bootstrap step. `operation_timeout` is
    /// carried by the returned handles for request-path calls.
    pub async fn initialize(
        configs: impl IntoIterator<Item = ConnectionConfig>,
        connect_timeout: Duration,
        operation_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        sqlx::any::install_default_drivers();

        let mut connections: BTreeMap<String, ConnectionHandle> = BTreeMap::new();
        for config in configs {
            if connections.contains_key(&config.name) {
                let err = ConnectionError::BootstrapFailed {
                    name: config.name.clone(),
                    reason: "duplicate connection name".to_string(),
                    source: None,
                };
                close_all(&connections).await;
                return Err(err);
            }

            match open(&config, connect_timeout, operation_timeout).await {
                Ok(handle) => {
                    tracing::info!(
                        connection = %config.name,
                        driver = ?config.driver,
                        "Connected to database '{}'",
                        config.database
                    );
                    connections.insert(config.name.clone(), handle);
                }
                Err(e) => {
                    tracing::error!(connection = %config.name, "Registry initialization failed: {e}");
                    close_all(&connections).await;
                    return Err(e);
                }
            }
        }

        Ok(Self {
            connections: Arc::new(connections),
        })
    }

    /// Look up a connection by logical name.
    ///
    /// Unknown names are a caller/configuration mismatch and return
    /// [`ConnectionError::NotConfigured`] immediately.
    pub fn get(&self, name: &str) -> Result<ConnectionHandle, ConnectionError> {
        self.connections
            .get(name)
            .cloned()
            .ok_or_else(|| ConnectionError::NotConfigured {
                name: name.to_string(),
            })
    }

    /// Configured names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Recorder every connection; used by the health endpoint.
    pub async fn check_all(&self) -> Vec<(String, bool)> {
        let mut results = Vec::with_capacity(self.connections.len());
        for (name, handle) in self.connections.iter() {
            let healthy = match handle.ping().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(connection = %name, "Liveness check failed: {e}");
                    false
                }
            };
            results.push((name.clone(), healthy));
        }
        results
    }

    /// Close every pool. Called once at shutdown.
    pub async fn close(&self) {
        close_all(&self.connections).await;
    }
}

async fn close_all(connections: &BTreeMap<String, ConnectionHandle>) {
    for (name, handle) in connections {
        handle.pool.close().await;
        tracing::debug!(connection = %name, "Closed connection pool");
    }
}

/// Bound one bootstrap step; an elapsed timeout counts as unreachable.
async fn within<T>(
    name: &str,
    step: &str,
    limit: Duration,
    fut: impl Future<Output = Result<T, ConnectionError>>,
) -> Result<T, ConnectionError> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| {
            Err(ConnectionError::Unreachable {
                name: name.to_string(),
                reason: format!("{step} timed out after {}ms", limit.as_millis()),
                source: None,
            })
        })
}

async fn open(
    config: &ConnectionConfig,
    connect_timeout: Duration,
    operation_timeout: Duration,
) -> Result<ConnectionHandle, ConnectionError> {
    let name = config.name.as_str();

    match config.driver {
        Driver::Mysql => bootstrap_mysql(config, connect_timeout).await?,
        Driver::Sqlite => bootstrap_sqlite(config).await?,
    }

    let url = config.database_url()?;
    tracing::debug!(connection = %name, "Opening pool at {}", redact_url(&url));

    // An in-memory SQLite database is destroyed when its last connection
    // closes, so keep one connection alive for the life of the pool.
    let options = if config.is_sqlite_memory() {
        AnyPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        AnyPoolOptions::new().max_connections(config.max_connections.max(1))
    };
    let pool = within(name, "connect", connect_timeout, async {
        options
            .acquire_timeout(connect_timeout)
            .connect(&url)
            .await
            .unreachable(name, "Failed to open connection pool")
    })
    .await?;

    let handle = ConnectionHandle {
        name: Arc::from(name),
        driver: config.driver,
        pool,
        operation_timeout,
    };

    let checked = within(name, "liveness check", connect_timeout, async {
        sqlx::query("SELECT 1")
            .execute(handle.pool())
            .await
            .unreachable(name, "Liveness check failed")
    })
    .await;
    if let Err(e) = checked {
        handle.pool.close().await;
        return Err(e);
    }

    Ok(handle)
}

async fn bootstrap_mysql(
    config: &ConnectionConfig,
    connect_timeout: Duration,
) -> Result<(), ConnectionError> {
    let name = config.name.as_str();
    let server_url = config.server_url()?.to_string();
    tracing::debug!(connection = %name, "Bootstrapping via {}", redact_url(&server_url));

    let mut conn = within(name, "server connect", connect_timeout, async {
        AnyConnection::connect(&server_url)
            .await
            .unreachable(name, "Failed to connect to server")
    })
    .await?;

    let create = format!("CREATE DATABASE IF NOT EXISTS `{}`", config.database);
    let created = within(name, "create database", connect_timeout, async {
        conn.execute(create.as_str())
            .await
            .map(|_| ())
            .bootstrap_failed(name, &format!("Failed to create database {}", config.database))
    })
    .await;

    if let Err(e) = conn.close().await {
        tracing::warn!(connection = %name, "Failed to close bootstrap connection: {e}");
    }
    created
}

async fn bootstrap_sqlite(config: &ConnectionConfig) -> Result<(), ConnectionError> {
    if config.is_sqlite_memory() {
        return Ok(());
    }
    let parent = Path::new(&config.database).parent();
    if let Some(dir) = parent.filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ConnectionError::BootstrapFailed {
                name: config.name.clone(),
                reason: format!("Failed to create directory {}: {e}", dir.display()),
                source: None,
            })?;
    }
    Ok(())
}
