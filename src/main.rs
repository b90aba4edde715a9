mod api;
mod app;
mod auth;
mod config;
mod db;
mod domain;
mod error;
mod logging;
mod middleware;
mod procurement;
mod routes;
mod services;
mod store;

use anyhow::{Context, Result};
use std::sync::Arc;

use config::StoreBackend;
use services::EventPublisher;
use store::{MemoryStore, PgStore, ProcurementStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting civisource backend"
    );

    // Create the procurement store
    let store: Arc<dyn ProcurementStore> = match settings.store_backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&settings).await?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Shared HTTP client for JWKS fetches and award event delivery
    let http_client = reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")?;

    // Create JWKS cache for JWT verification
    let jwks_cache = auth::JwksCache::new(
        http_client.clone(),
        settings.jwt_jwks_url.clone(),
        settings.jwt_issuer.clone(),
        settings.jwt_audience.clone(),
        settings.jwks_cache_ttl_seconds,
    );

    // Optionally warm the JWKS cache
    if let Err(e) = jwks_cache.warm_cache().await {
        tracing::warn!(error = %e, "Failed to warm JWKS cache - will fetch on first request");
    }

    // Award event publisher
    let webhook_url = settings
        .award_webhook_url
        .as_deref()
        .map(|s| s.parse::<url::Url>().context("Invalid AWARD_WEBHOOK_URL"))
        .transpose()?;
    let events = EventPublisher::new(http_client, webhook_url);

    // Create application state
    let state = app::AppState::new(store, settings.clone(), jwks_cache, events);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
