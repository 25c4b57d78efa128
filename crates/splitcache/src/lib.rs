// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Splitcache: OAuth 1.0a login against an expense service plus a per-user
//! on-disk cache of the user's expenses, served as JSON.

pub mod cache;
pub mod config;
pub mod credential;
pub mod error;
pub mod session;
pub mod state;
pub mod transport;
pub mod upstream;

#[cfg(test)]
mod test_support;

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ServiceConfig};
use crate::state::{spawn_sweeper, AppState};
use crate::transport::build_router;

/// Install the global subscriber per `--log-level`, `--log-format` and
/// `--log-file`. An unparsable level falls back to `info`.
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format == "json";

    let result = match config.log_file {
        Some(ref path) => {
            let file = OpenOptions::new().create(true).append(true).open(path).map_err(|e| {
                anyhow::anyhow!("error opening log file {}: {e}", path.display())
            })?;
            let writer = Mutex::new(file);
            if json {
                fmt::fmt().with_env_filter(filter).with_ansi(false).with_writer(writer).json().try_init()
            } else {
                fmt::fmt().with_env_filter(filter).with_ansi(false).with_writer(writer).try_init()
            }
        }
        None if json => fmt::fmt().with_env_filter(filter).json().try_init(),
        None => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
    Ok(())
}

/// Resolve when the process is asked to stop (Ctrl-C, or SIGTERM on unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Run the server until shutdown.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let service = ServiceConfig::load(&config.config)?;
    std::fs::create_dir_all(&service.data_path).map_err(|e| {
        anyhow::anyhow!("error creating data directory {}: {e}", service.data_path.display())
    })?;

    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState::new(service, shutdown.clone())?);

    spawn_sweeper(Arc::clone(&state));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            tracing::info!("shutting down");
            shutdown.cancel();
        });
    }

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(data_path = %state.config.data_path.display(), "splitcache listening on {addr}");
    axum::serve(listener, build_router(state)).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
