//! Periodic housekeeping.

use std::{io, path::PathBuf, time::Duration};

use tokio::{task::JoinHandle, time::Instant};

/// Empty each directory by removing and recreating it.
///
/// Failures are logged per directory and do not stop the others.
pub async fn cleanup_dirs(dirs: &[PathBuf]) {
    for dir in dirs {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => tracing::info!("Cleaned up directory: {}", dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Error cleaning up directory {}: {e}", dir.display()),
        }
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            tracing::warn!("Error recreating directory {}: {e}", dir.display());
        }
    }
}

/// Run [`cleanup_dirs`] every `interval`, first after one full interval.
///
/// Abort the returned handle to stop it.
pub fn spawn_cleanup(dirs: Vec<PathBuf>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        loop {
            ticker.tick().await;
            tracing::debug!("Running scheduled cleanup");
            cleanup_dirs(&dirs).await;
        }
    })
}
