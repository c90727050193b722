//! semantic_gateway - REST server for the semantic gateway.
//!
//! Configuration comes from env vars (see [`semantic_gateway::config`]).

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use semantic_gateway::api::auth::JwtConfig;
use semantic_gateway::api::build_router;
use semantic_gateway::config::GatewayConfig;
use semantic_gateway::dispatch::{IntentDispatcher, IntentRegistry};
use semantic_gateway::gateway::Gateway;
use semantic_gateway::health::{
    HealthAggregator, PostgresProbe, RedisProbe, WORKER_POOL_COMPONENT,
};
use semantic_gateway::llm::create_resolver;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,semantic_gateway=debug".into()),
        )
        .init();

    let config = GatewayConfig::from_env()?;

    // Pool connects on first use so the server starts even when the
    // database is down; /status reports it.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_lazy(&config.database_url)
        .context("invalid DATABASE_URL")?;
    let redis = RedisProbe::open(&config.redis_url)?;

    let resolver = create_resolver(&config.llm)?;

    let registry = Arc::new(IntentRegistry::new().with_catalog());
    tracing::info!("Registered intents: {:?}", registry.intents());
    let gateway = Arc::new(
        Gateway::new(resolver, IntentDispatcher::new(registry))
            .with_request_timeout(config.request_timeout),
    );

    let health = Arc::new(
        HealthAggregator::new(config.probe_timeout)
            .with_probe(Arc::new(PostgresProbe::new(pool.clone())))
            .with_probe(Arc::new(redis))
            .with_unchecked(WORKER_POOL_COMPONENT),
    );

    let jwt_config = JwtConfig::from_secret(config.jwt_secret.as_bytes());
    let mut app = build_router(gateway, health, jwt_config);
    if config.cors_allow_any {
        tracing::warn!("CORS: allowing any origin");
        app = app.layer(CorsLayer::permissive());
    }

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("semantic_gateway listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shutting down, closing database pool");
    pool.close().await;
    Ok(())
}

/// Resolve when `signal` fires. A listener that fails to install never resolves.
async fn signal_or_pending<F>(name: &str, signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!("failed to install {} handler: {}", name, e);
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = signal_or_pending("ctrl-c", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
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
    tracing::info!("Shutdown signal received");
}
