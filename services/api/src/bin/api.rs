//! services/api/src/bin/api.rs

use chrono::Duration;
use donatello_quiz_core::ports::IdentityProvider;
use quiz_api_lib::{
    adapters::{FirebaseIdentityAdapter, OpenAiQuizAdapter},
    config::Config,
    error::ApiError,
    web::{api_router, identity::IdentityGate, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::Router;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// How often expired auth sessions are evicted and their sockets signed out.
const AUTH_SWEEP_PERIOD: std::time::Duration = std::time::Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize the Quiz Content Adapter ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);
    let quiz_provider = Arc::new(OpenAiQuizAdapter::new(
        openai_client,
        config.quiz_model.clone(),
    ));

    // --- 3. Initialize the Identity Gate ---
    let http = reqwest::Client::new();
    let identity = IdentityGate::from_settings(
        &config.identity,
        Duration::days(config.auth_session_days),
        |firebase| {
            info!("Identity provider configured for project {}", firebase.project_id);
            Arc::new(FirebaseIdentityAdapter::new(http, firebase)) as Arc<dyn IdentityProvider>
        },
    );
    match &identity {
        IdentityGate::Ready(auth) => {
            auth.spawn_sweeper(AUTH_SWEEP_PERIOD);
        }
        IdentityGate::Unconfigured(instructions) => warn!(
            "Identity provider is not configured (missing: {}). Sign-in is disabled until it is.",
            instructions.missing_vars.join(", ")
        ),
    }

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        quiz_provider,
        identity,
    });

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router(app_state))
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
