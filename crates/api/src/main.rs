use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use learnhub_api::{AppConfig, AppState, build_app};
use learnhub_infra::{PostgresAccountDirectory, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    learnhub_observability::init();

    let config = AppConfig::from_env().map_err(|err| {
        tracing::error!(error = %err, "refusing to start with invalid configuration");
        err
    })?;
    tracing::info!(environment = ?config.environment, port = config.port, "configuration loaded");

    let pool = db::connect(
        &config.database_url,
        config.database_max_connections,
        config.auth_timeout,
    )
    .await
    .context("failed to connect to database")?;
    db::migrate(&pool).await.context("failed to run migrations")?;

    let port = config.port;
    let state = AppState::new(config, Arc::new(PostgresAccountDirectory::new(pool)));
    spawn_rate_limit_housekeeping(&state);

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind 0.0.0.0:{port}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("shut down cleanly");
    Ok(())
}

/// Drop idle rate-limit buckets so the keyed store does not grow without bound.
fn spawn_rate_limit_housekeeping(state: &AppState) {
    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            tick.tick().await;
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
