pub mod health;
pub mod serve;
pub mod user;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("watcher={level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
