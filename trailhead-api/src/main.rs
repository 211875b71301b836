//! # Trailhead API Server
//!
//! Serves the tour booking API and page routes.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p trailhead-api
//! ```
//!
//! With `STORAGE_BACKEND=memory` the server runs without a database.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trailhead_api::{
    app::{build_router, AppState},
    config::{Config, StorageBackend},
};
use trailhead_shared::db::migrations::run_migrations;
use trailhead_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use trailhead_shared::services::mailer::LogMailer;
use trailhead_shared::services::payments::HttpPaymentProvider;
use trailhead_shared::store::Stores;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trailhead_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Trailhead API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let (stores, pool) = match config.storage {
        StorageBackend::Postgres => {
            let pool = create_pool(DatabaseConfig {
                url: config.database.url.clone(),
                max_connections: config.database.max_connections,
                ..Default::default()
            })
            .await?;
            run_migrations(&pool).await?;
            (Stores::postgres(pool.clone()), Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            (Stores::memory(), None)
        }
    };

    let mailer = Arc::new(LogMailer::new(&config.mail.from));
    let payments = Arc::new(HttpPaymentProvider::new(
        &config.payments.api_url,
        &config.payments.access_token,
    )?);

    let address = config.bind_address();
    let app = build_router(AppState::new(stores, config, mailer, payments));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received, exiting...");
}
