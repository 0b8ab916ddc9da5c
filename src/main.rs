// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parcel_locker_server::{
    api::router,
    auth::session,
    config::{AppConfig, AuthMode, ConfigError, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::{Database, SessionRepository, StoreError},
    validation::{self, PatternError},
};

/// How often expired sessions are purged in session mode.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Time given to in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("validation patterns: {0}")]
    Patterns(#[from] PatternError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("server: {0}")]
    Server(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // Logging is not up yet.
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), StartupError> {
    validation::init()?;

    let db = Database::open_in(&config.data_dir)?;
    tracing::info!(data_dir = %config.data_dir.display(), "Store opened");

    let state = AppState::new(db, &config);
    let cancel = CancellationToken::new();

    if config.auth_mode == AuthMode::Session {
        let purged = state
            .with_store(|db| SessionRepository::new(db).purge_expired(Utc::now()))
            .await?;
        tracing::info!(purged, "Purged expired sessions at startup");

        tokio::spawn(session::run_sweeper(
            state.clone(),
            SESSION_SWEEP_INTERVAL,
            cancel.clone(),
        ));
    }

    let app = router(state, &config);
    let addr = config.bind_addr();

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_cancel.cancel();
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    tracing::info!(
        %addr,
        auth_mode = ?config.auth_mode,
        "Parcel locker listening (docs at /docs)"
    );
    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    cancel.cancel();
    tracing::info!("Server stopped");
    Ok(())
}

fn init_logging(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init(),
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
