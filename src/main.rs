use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trustscan_backend_core::{
    app_config::CONFIG, build_router, db::mask_connection_string, initialize_app_state,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = &*CONFIG;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.rust_log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        environment = %config.environment,
        cache_backend = %config.cache.backend,
        cache_ttl_seconds = config.cache.ttl_seconds,
        "Starting TrustScan backend"
    );
    if !config.database.url.is_empty() {
        info!(database = %mask_connection_string(&config.database.url), "Database configured");
    }
    info!(sources = ?config.configured_sources(), "Intelligence sources");

    let state = match initialize_app_state(config).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialize application state");
            return Err(anyhow::anyhow!("initialization failed: {}", e));
        },
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    info!(address = %config.server.bind_address, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
