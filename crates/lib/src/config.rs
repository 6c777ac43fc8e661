//! Service configuration.
//!
//! Configuration is read from a TOML file once at startup and is immutable
//! afterwards. Every section has defaults so a minimal file only needs the
//! `[databases.*]` tables:
//!
//! ```toml
//! [server]
//! port = 3000
//!
//! [kv]
//! backend = "redis"
//! url = "redis://127.0.0.1:6379/0"
//!
//! [databases.users]
//! host = "127.0.0.1"
//! port = 3306
//! user = "watcher"
//! password = "secret"
//! database = "watcher_users"
//! ```

use std::{collections::BTreeMap, path::Path, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::registry::{ConnectionConfig, Driver};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`Config`].
    #[error("Failed to parse config file")]
    Parse {
        #[source]
        source: toml::de::Error,
    },

    /// The configuration parsed but is inconsistent.
    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

impl ConfigError {
    fn invalid(reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            reason: reason.into(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub kv: KvConfig,
    pub timeouts: TimeoutConfig,
    pub auth: AuthConfig,
    /// Named relational connections, keyed by logical name.
    pub databases: BTreeMap<String, ConnectionConfig>,
    pub docvault: DocVaultConfig,
    pub outbox: OutboxConfig,
    pub ghostscript: GhostscriptConfig,
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Set the `Secure` attribute on the session cookie.
    pub secure_cookies: bool,
    /// Wrap protected routes with the session gate.
    pub gate_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            secure_cookies: false,
            gate_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for the `watcher` targets; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Which key-value store holds sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KvBackend {
    Redis,
    /// Process-local store, sessions are lost on restart.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KvConfig {
    pub backend: KvBackend,
    pub url: String,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            backend: KvBackend::Redis,
            url: "redis://127.0.0.1:6379/0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on each registry bootstrap step and the initial kv ping.
    pub connect_secs: u64,
    /// Bound on each kv call and each request-path database call.
    pub operation_secs: u64,
    /// Bound on one Ghostscript run.
    pub compression_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            operation_secs: 5,
            compression_secs: 120,
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn operation(&self) -> Duration {
        Duration::from_secs(self.operation_secs)
    }

    pub fn compression(&self) -> Duration {
        Duration::from_secs(self.compression_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Logical connection name holding the `users` table.
    pub database: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            database: "users".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocVaultConfig {
    pub scanned_dir: PathBuf,
    pub index_path: PathBuf,
}

impl Default for DocVaultConfig {
    fn default() -> Self {
        Self {
            scanned_dir: PathBuf::from("src/scanned"),
            index_path: PathBuf::from("src/libs/scanned.json"),
        }
    }
}

/// Outgoing letter register workbook and its JSON rendition.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    pub workbook_path: PathBuf,
    pub sheet: String,
    pub json_path: PathBuf,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            workbook_path: PathBuf::from("src/libs/outbox.xlsx"),
            sheet: "Sheet1".to_string(),
            json_path: PathBuf::from("src/libs/outbox.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GhostscriptConfig {
    pub path: PathBuf,
    pub compression_levels: Vec<String>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for GhostscriptConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/usr/bin/gs"),
            compression_levels: ["screen", "ebook", "printer", "prepress", "default"]
                .into_iter()
                .map(String::from)
                .collect(),
            input_dir: PathBuf::from("tmp/pdfcompression/input"),
            output_dir: PathBuf::from("tmp/pdfcompression/output"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub cleanup_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: 24 * 60 * 60,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Connection configs with their logical names filled in, in name order.
    pub fn connections(&self) -> Vec<ConnectionConfig> {
        self.databases
            .iter()
            .map(|(name, cfg)| ConnectionConfig {
                name: name.clone(),
                ..cfg.clone()
            })
            .collect()
    }

    /// Validate configuration settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server port cannot be 0"));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::invalid(format!(
                "invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        if self.kv.backend == KvBackend::Redis {
            if self.kv.url.trim().is_empty() {
                return Err(ConfigError::invalid("kv.url is required for the redis backend"));
            }
            if !cfg!(feature = "redis") {
                return Err(ConfigError::invalid(
                    "kv.backend = \"redis\" requires the `redis` feature",
                ));
            }
        }

        if self.timeouts.connect_secs == 0 || self.timeouts.operation_secs == 0 {
            return Err(ConfigError::invalid("timeouts must be greater than 0"));
        }

        if !self.databases.contains_key(&self.auth.database) {
            return Err(ConfigError::invalid(format!(
                "auth.database '{}' has no [databases.{}] entry",
                self.auth.database, self.auth.database
            )));
        }

        if self.outbox.sheet.trim().is_empty() {
            return Err(ConfigError::invalid("outbox.sheet cannot be empty"));
        }

        for (name, db) in &self.databases {
            if db.database.trim().is_empty() {
                return Err(ConfigError::invalid(format!(
                    "databases.{name}: database cannot be empty"
                )));
            }
            if db.driver == Driver::Mysql && !is_plain_identifier(&db.database) {
                return Err(ConfigError::invalid(format!(
                    "databases.{name}: '{}' is not a valid database name",
                    db.database
                )));
            }
        }

        Ok(())
    }
}

/// Redact credentials from a connection URL for safe logging.
pub fn redact_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut redacted = parsed.clone();
        if !parsed.username().is_empty() {
            let _ = redacted.set_username("***");
        }
        if parsed.password().is_some() {
            let _ = redacted.set_password(Some("***"));
        }
        redacted.to_string()
    } else {
        "***@<unparsable-url>".to_string()
    }
}

/// Letters, digits, `_` and `$` only. Database names are interpolated into
/// `CREATE DATABASE`, which cannot take bind parameters.
pub(crate) fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
