//! Main Entrypoint for the CareerFlow Interview API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the database connection pool and running migrations.
//! 3. Initializing shared services (LLM, speech, and context clients).
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use careerflow_api::{
    config::{Config, Provider},
    db::Db,
    router::create_router,
    state::AppState,
};
use careerflow_core::{
    context::HttpContextService,
    llm_client::OpenAICompatibleClient,
    speech::OpenAISpeechService,
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Database ---
    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let db = Arc::new(Db::new(pool));
    db.run_migrations().await?;
    info!("Database connection established and migrations are up-to-date.");

    // --- 4. Initialize Shared Services ---
    // Speech (transcription and synthesis) always goes through OpenAI; the
    // chat provider is selectable because Gemini exposes an OpenAI-compatible
    // chat surface but no speech endpoints.
    let openai_config = match &config.provider {
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            OpenAIConfig::new()
                .with_api_key(config.openai_api_key.as_ref().unwrap())
                .with_api_base("https://api.openai.com/v1/")
        }
        Provider::Gemini => {
            info!("Using Gemini provider.");
            OpenAIConfig::new()
                .with_api_key(config.gemini_api_key.as_ref().unwrap())
                .with_api_base("https://generativelanguage.googleapis.com/v1beta/openai")
        }
    };
    let speech_config = match &config.provider {
        Provider::OpenAI => openai_config.clone(),
        Provider::Gemini => OpenAIConfig::new()
            .with_api_key(
                config
                    .openai_api_key
                    .clone()
                    .context("OPENAI_API_KEY is required for speech even with the Gemini provider")?,
            )
            .with_api_base("https://api.openai.com/v1/"),
    };

    let llm_client = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));
    let speech_service = Arc::new(OpenAISpeechService::new(speech_config));
    let context_service = Arc::new(HttpContextService::new(config.context_service_url.clone()));

    let app_state = Arc::new(AppState {
        db,
        context_service,
        llm_client,
        speech_service,
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
