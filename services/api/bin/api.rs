//! Main Entrypoint for the Vigil API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Constructing the orchestration state and its collaborators.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use axum::http::HeaderValue;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use vigil_api::{
    broadcast::Broadcaster,
    config::Config,
    presence::FrameWatchLoop,
    router::create_router,
    sink::JsonlLogSink,
    state::AppState,
    worker::WorkerController,
};
use vigil_core::{
    capture::{CaptureDevice, MicCapture},
    frames::FrameStore,
    logbook::{LogBook, LogSink},
    mode::SharedMode,
    presence::PresenceLoop,
    thinker::{LlmThinker, Thinker},
    token::{StreamingTokenClient, TokenProvider},
};

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

    // --- 3. Construct the Orchestration State ---
    let mode = Arc::new(SharedMode::new());
    let logbook = Arc::new(LogBook::new());
    let frames = Arc::new(FrameStore::new());
    let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&mode), Arc::clone(&logbook)));

    let sensing: Arc<dyn PresenceLoop> = Arc::new(FrameWatchLoop::new(
        Arc::clone(&frames),
        Arc::clone(&broadcaster),
    ));
    let capture: Arc<dyn CaptureDevice> = Arc::new(MicCapture::new());
    let worker = Arc::new(WorkerController::new(
        Arc::clone(&sensing),
        Arc::clone(&broadcaster),
        Arc::clone(&mode),
        Arc::clone(&logbook),
        capture,
    ));

    let sink: Arc<dyn LogSink> = Arc::new(JsonlLogSink::new(config.logs_dir.clone()));
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.openai_api_key)
        .with_api_base(&config.openai_api_base);
    let thinker: Arc<dyn Thinker> = Arc::new(LlmThinker::new(
        openai_config,
        config.chat_model.clone(),
        config.thinker_system_prompt.clone(),
    ));
    let tokens: Arc<dyn TokenProvider> = Arc::new(StreamingTokenClient::new(
        config.streaming_token_url.clone(),
        config.streaming_api_key.clone(),
        config.token_ttl_seconds,
    )?);

    let app_state = Arc::new(AppState {
        mode,
        broadcaster,
        worker,
        frames,
        logbook,
        sink,
        thinker,
        tokens,
        sensing,
        config: Arc::new(config.clone()),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allowed_origin
                .parse::<HeaderValue>()
                .context("CORS_ALLOW_ORIGIN is not a valid header value")?,
        )
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        bind_address = %config.bind_address,
        model = %config.chat_model,
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
