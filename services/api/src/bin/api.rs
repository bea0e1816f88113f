//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, GitHubAdapter},
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, AppState},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_adapter = Arc::new(
        DbAdapter::connect(&config.database_url, config.db_max_connections).await?,
    );
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Identity Provider Adapter ---
    let github_adapter = Arc::new(
        GitHubAdapter::new(
            config.github_client_id.clone(),
            config.github_client_secret.clone(),
            config.github_token_url.clone(),
            config.github_api_url.clone(),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?,
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        db_adapter.clone(),
        db_adapter,
        github_adapter,
    ));

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = web::router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
