//! airdnd server
//!
//! Usage:
//!   cargo run --bin load_data    # seed sample users, homes, a booking and a review
//!   cargo run --bin airdnd       # start the REST API
//!
//! Configuration comes from flags, `AIRDND_*` environment variables or a
//! `.env` file; see `airdnd --help`.

use tokio::net::TcpListener;

use airdnd::auth::TokenKeys;
use airdnd::config::Config;
use airdnd::rest::{create_router, AppState};
use airdnd::services::Services;
use airdnd::storage::Storage;
use airdnd::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let _guard = telemetry::init(config.log_json);

    tracing::info!(bind = %config.bind, db_path = %config.db_path, "airdnd starting");

    // Opened lazily on the first request that touches a collection
    let storage = Storage::new(&config.db_path);
    let services = Services::new(storage, config.bcrypt_cost);
    let tokens = TokenKeys::new(config.jwt_secret().as_bytes(), config.token_ttl_secs);

    let app = create_router(AppState::new(services, tokens), &config.cors_origins);

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!("listening on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
    }
    tracing::info!("shutting down");
}
