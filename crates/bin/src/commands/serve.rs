//! Serve command - runs the Watcher web server.

use std::{net::SocketAddr, path::Path, time::Duration};

use tokio::signal::unix::{SignalKind, signal};

use watcher::{
    config::Config,
    maintenance,
    server::{self, AppState, verify_ghostscript},
};

use crate::cli::ServeArgs;

/// Run the Watcher server
pub async fn run(config_path: &Path, args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_file(config_path)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if args.no_gate {
        config.server.gate_enabled = false;
    }
    config.validate()?;

    super::init_tracing(&config.logging.level);
    tracing::info!("Loaded configuration from {}", config_path.display());

    // A missing binary only disables compression; the rest of the service runs.
    verify_ghostscript(&config.ghostscript.path, config.timeouts.connect()).await;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let cleanup_dirs = vec![
        config.ghostscript.input_dir.clone(),
        config.ghostscript.output_dir.clone(),
    ];
    let cleanup_interval = Duration::from_secs(config.maintenance.cleanup_interval_secs);

    // Fails fast if any backend is unreachable
    let state = AppState::connect(config).await?;

    let cleanup = (!cleanup_interval.is_zero())
        .then(|| maintenance::spawn_cleanup(cleanup_dirs, cleanup_interval));

    let app = server::router(state.clone());

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            state.registry.close().await;
            return Err(e.into());
        }
    };
    let local_addr = listener.local_addr()?;

    println!("Watcher server started on http://{local_addr}");
    println!();
    println!("Available endpoints:");
    println!("  POST /auth/login              - Log in with NIP and password");
    println!("  POST /auth/logout             - End the current session");
    println!("  GET  /auth/session            - Current session identity");
    println!("  GET  /health                  - Backend health");
    println!("  GET  /docvault/update         - Rebuild the scanned document index");
    println!("  GET  /docvault/get            - Read the scanned document index");
    println!("  GET  /mfwp/get/{{npwp}}         - Taxpayer master file lookup");
    println!("  GET  /outbox/update           - Convert the outgoing letter register");
    println!("  GET  /outbox/get              - Read the outgoing letter register");
    println!("  POST /utils/pdfcompression    - Compress the staged PDF");
    println!();
    println!("Press Ctrl+C to shutdown");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    if let Some(cleanup) = cleanup {
        cleanup.abort();
    }
    state.registry.close().await;
    served?;

    println!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => Some(sigterm),
        Err(e) => {
            tracing::warn!("Failed to set up SIGTERM handler: {e}");
            None
        }
    };

    let terminate = async {
        match sigterm.as_mut() {
            Some(sigterm) => {
                sigterm.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
        _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT, initiating graceful shutdown..."),
    }
}
