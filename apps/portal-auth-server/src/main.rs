// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use portal_auth_server::{
    api::router,
    auth::{AuthGate, AuthMode, CookieSettings, SessionStore, TokenCodec},
    config::AppConfig,
    logging,
    providers::SupabaseClient,
    state::AppState,
    sweeper::SessionSweeper,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut codec = TokenCodec::new(&config.jwt_secret)?.with_ttls(config.access_ttl, config.refresh_ttl);
    if config.auth_mode == AuthMode::CookieSession {
        if let Some(audience) = &config.jwt_audience {
            codec = codec.with_audience(audience.clone());
        }
    }

    let supabase = Arc::new(SupabaseClient::new(
        config.supabase_url.as_str(),
        config.supabase_service_role_key.clone(),
        config.supabase_anon_key.clone(),
    )?);

    info!(supabase_url = %supabase.base_url(), "Identity provider configured");

    let sessions = Arc::new(SessionStore::new(config.session_capacity, config.session_idle_timeout));
    let cookie = CookieSettings {
        name: config.cookie_name.clone(),
        secure: config.cookie_secure,
        max_age: sessions.idle_timeout(),
    };
    let gate = AuthGate::new(
        config.auth_mode,
        cookie,
        Arc::new(codec),
        sessions.clone(),
        supabase.clone(),
        supabase,
    );

    let app = router(AppState::new(gate));

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(SessionSweeper::new(sessions).run(shutdown.clone()));

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, auth_mode = %config.auth_mode, "Portal auth server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        error!(error = %e, "Session sweeper task failed");
    }
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => {},
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
