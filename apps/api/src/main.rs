use std::sync::Arc;

use anyhow::Context;
use axum::{extract::Request, ServiceExt};
use dotenv::dotenv;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use shared_config::AppConfig;
use shared_database::{AppState, Database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduling API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Open the store and make sure the tables exist
    let db = Database::connect(&config).await?;
    db.create_db_and_tables().await?;

    // Create shared state
    let state = Arc::new(AppState::new(config, db));
    let addr = state.config.bind_address();

    // Build the application
    let app = router::create_app(state);

    // Run the server
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .await
        .context("Server error")?;

    Ok(())
}
