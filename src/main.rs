//! Hospital Service Server
//!
//! Loads configuration, migrates the database, wires the service container
//! and serves every API route until interrupted.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use dotenv::dotenv;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use hospital_service::{
    api::{recovery_layer, AppState, RouterBuilder},
    app::{build_container, spawn_otp_cleanup, Infrastructure},
    config::AppConfig,
    utils::ErrorRegistry,
};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", err);
    }
    log::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv().ok();

    env_logger::init();

    log::info!("Starting Hospital Service v{}", hospital_service::VERSION);

    let config = AppConfig::from_env()?;
    config.validate()?;
    log::info!("Configuration loaded ({} environment)", config.environment);

    let errors = Arc::new(ErrorRegistry::load(config.error_registry_path.as_deref())?);
    log::info!("Error registry loaded with {} codes", errors.len());

    let database_pool = config.database.create_pool().await?;

    log::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&database_pool).await?;
    log::info!("Database migrations completed");

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let cors = cors_layer(&config.server.cors_origins);
    let cleanup_interval = Duration::from_secs(config.otp.cleanup_interval_seconds);

    let infrastructure = Infrastructure::postgres(database_pool, config.email.as_ref())?;
    let container = build_container(config, infrastructure);

    let cleanup = spawn_otp_cleanup(container.clone(), cleanup_interval);
    log::info!(
        "Expired OTP cleanup runs every {} seconds",
        cleanup_interval.as_secs()
    );

    let state = AppState::new(container, errors.clone());
    let app = RouterBuilder::with_all_routes().build(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(recovery_layer(errors))
            .into_inner(),
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.abort();
    log::info!("Server stopped");

    Ok(())
}
