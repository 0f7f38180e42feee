//! Daemon module for TubeSleep.
//!
//! This module contains the core daemon functionality:
//! - `timer`: sleep countdown and sleep mode
//! - `scheduler`: cancellable timer tasks
//! - `orchestrator`: the session state machine
//! - `session`: async driver executing orchestrator effects
//! - `ipc`: Unix socket server and request handler

pub mod error;
pub mod ipc;
pub mod orchestrator;
pub mod scheduler;
pub mod session;
pub mod timer;

pub use error::SessionError;
pub use ipc::{IpcError, IpcServer, RequestHandler};
pub use orchestrator::{Effect, Orchestrator, SessionEvent, Transition};
pub use scheduler::{ScopedTimer, TimerKind, TimerSet, TimerSignal, TICK_PERIOD};
pub use session::SessionDriver;
pub use timer::{CountdownTick, CountdownTimer, SleepModeGate};

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};

use crate::config::{load_config, AppPaths};
use crate::playback::TracingPlayerSink;
use crate::playlist::{JsonPlaylistStore, PlaylistStore};

/// Runs the daemon in the foreground until Ctrl+C or SIGTERM.
pub async fn run_daemon(paths: &AppPaths) -> Result<()> {
    let config = load_config(&paths.config)?;
    let store = Arc::new(JsonPlaylistStore::new(&paths.playlist));
    let entries = store
        .load()
        .with_context(|| format!("Failed to load playlist: {}", paths.playlist.display()))?;
    info!(entries = entries.len(), "Playlist loaded");

    let orchestrator = Orchestrator::new(config, entries);
    let (driver, signals) = SessionDriver::new(orchestrator, store, Arc::new(TracingPlayerSink));
    let timer_loop = tokio::spawn(driver.clone().run(signals));

    let server = IpcServer::new(&paths.socket)?;
    info!(socket = %server.socket_path().display(), "Daemon listening");
    let handler = RequestHandler::new(driver.clone());

    tokio::select! {
        _ = accept_loop(&server, handler) => {}
        _ = shutdown_signal() => {}
    }

    driver.shutdown().await;
    timer_loop.abort();
    info!("Daemon stopped");
    Ok(())
}

async fn accept_loop(server: &IpcServer, handler: RequestHandler) {
    loop {
        match server.accept().await {
            Ok(stream) => {
                tokio::spawn(ipc::serve_connection(stream, handler.clone()));
            }
            Err(e) => error!(error = %e, "Failed to accept connection"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
