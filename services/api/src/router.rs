//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the control plane, the WebSocket endpoint, and the OpenAPI
//! documentation.

use crate::{
    handlers,
    models::{ErrorResponse, StateData, StateResponse, StatusData, StatusResponse, TokenData},
    state::AppState,
    ws::ws_handler,
};

use axum::{Router, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::start_loop,
        handlers::stop_loop,
        handlers::get_state,
        handlers::get_token,
    ),
    components(
        schemas(StatusResponse, StatusData, StateResponse, StateData, TokenData, ErrorResponse)
    ),
    tags(
        (name = "Vigil API", description = "Control plane for the presence sensing loop")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/start-loop", get(handlers::start_loop))
        .route("/stop-loop", get(handlers::stop_loop))
        .route("/state", get(handlers::get_state))
        .route("/token", get(handlers::get_token))
        .route("/ws", get(ws_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Merge the stateful routes with the stateless Swagger UI.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
