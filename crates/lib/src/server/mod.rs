//! HTTP surface.
//!
//! [`AppState`] holds the shared handles every handler needs; [`router`]
//! composes the public and protected routes. Whether the protected routes
//! sit behind the session gate is decided here, from
//! `server.gate_enabled`.

mod auth;
mod docvault;
mod error;
mod health;
mod mfwp;
mod outbox;
mod pdf;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;

pub use docvault::{DocIndex, DocItem, categorize};
pub use error::ApiError;
pub use outbox::{OutboxError, OutboxRecord, read_sheet};
pub use pdf::{CompressionError, compress_pdf, verify_ghostscript};

use crate::{
    Result,
    auth::{AuthResolver, gate},
    clock::{Clock, SystemClock},
    config::{Config, KvBackend},
    credentials::{Authenticator, CredentialValidator, schema},
    kv::{InMemoryKv, KvStore},
    registry::{ConnectionError, ConnectionRegistry},
    session::SessionStore,
};

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: ConnectionRegistry,
    pub sessions: SessionStore,
    pub resolver: AuthResolver,
    pub authenticator: Authenticator,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire up state from already-open backends.
    ///
    /// Fails if the auth connection named in config is not in `registry`.
    pub fn new(
        config: Config,
        registry: ConnectionRegistry,
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
    ) -> std::result::Result<Self, ConnectionError> {
        let sessions = SessionStore::new(kv);
        let users = registry.get(&config.auth.database)?;
        let authenticator =
            Authenticator::new(CredentialValidator::new(users), sessions.clone());

        Ok(Self {
            config: Arc::new(config),
            registry,
            resolver: AuthResolver::new(sessions.clone()),
            sessions,
            authenticator,
            clock,
        })
    }

    /// Open every backend named in `config` and prepare the user directory.
    ///
    /// Any failure here is fatal to startup; pools opened so far are closed
    /// before returning.
    pub async fn connect(config: Config) -> Result<Self> {
        let kv = open_kv(&config).await?;

        let registry = ConnectionRegistry::initialize(
            config.connections(),
            config.timeouts.connect(),
            config.timeouts.operation(),
        )
        .await?;

        let state = match AppState::new(config, registry.clone(), kv, Arc::new(SystemClock)) {
            Ok(state) => state,
            Err(e) => {
                registry.close().await;
                return Err(e.into());
            }
        };

        let users = state.registry.get(&state.config.auth.database)?;
        if let Err(e) = schema::ensure_users_table(&users).await {
            state.registry.close().await;
            return Err(e.into());
        }
        Ok(state)
    }
}

async fn open_kv(config: &Config) -> Result<Arc<dyn KvStore>> {
    match config.kv.backend {
        KvBackend::Memory => {
            tracing::warn!("Using in-memory session store; sessions will not survive a restart");
            Ok(Arc::new(InMemoryKv::new()))
        }
        #[cfg(feature = "redis")]
        KvBackend::Redis => {
            let kv = crate::kv::RedisKv::connect(
                &config.kv.url,
                config.timeouts.connect(),
                config.timeouts.operation(),
            )
            .await?;
            Ok(Arc::new(kv))
        }
        #[cfg(not(feature = "redis"))]
        KvBackend::Redis => Err(crate::config::ConfigError::Invalid {
            reason: "kv.backend = \"redis\" requires the `redis` feature".to_string(),
        }
        .into()),
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/logout", post(auth::handle_logout))
        .route("/health", get(health::handle_health));

    let mut protected = Router::new()
        .route("/", get(handle_home))
        .route("/auth/session", get(auth::handle_session))
        .route("/docvault/update", get(docvault::handle_update))
        .route("/docvault/get", get(docvault::handle_get))
        .route("/outbox/update", get(outbox::handle_update))
        .route("/outbox/get", get(outbox::handle_get))
        .route("/mfwp/get/{npwp}", get(mfwp::handle_get))
        .route("/utils/pdfcompression", post(pdf::handle_compress));

    if state.config.server.gate_enabled {
        protected = gate::protect(protected, state.resolver.clone());
    } else {
        tracing::warn!("Session gate disabled; protected routes are open");
    }

    public
        .merge(protected)
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

/// Handler for GET /
async fn handle_home() -> &'static str {
    "Hello from watcher!"
}
