//! Axum Handlers for the Control Plane
//!
//! Thin request/response operations over the orchestration state. Every
//! handler returns a definite status; faults in collaborators surface here
//! as client or server errors, never as hung requests.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::{
    models::{ErrorResponse, StateData, StateResponse, StatusResponse, TokenData},
    state::AppState,
    worker::StartError,
};

pub enum ApiError {
    BadRequest(String),
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(message) => {
                error!("Internal Server Error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl From<StartError> for ApiError {
    fn from(err: StartError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Start the background sensing loop.
#[utoipa::path(
    get,
    path = "/start-loop",
    responses(
        (status = 200, description = "Loop started", body = StatusResponse),
        (status = 400, description = "No client connected, or loop already running", body = ErrorResponse)
    )
)]
pub async fn start_loop(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.worker.start().await?;
    Ok(Json(StatusResponse::started()))
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct StopParams {
    /// Whether to broadcast idle after stopping.
    #[serde(default = "default_broadcast")]
    pub broadcast: bool,
}

fn default_broadcast() -> bool {
    true
}

/// Stop the background sensing loop.
///
/// Idempotent: stopping an already-stopped loop still broadcasts and cleans
/// up. Blocks until the worker has fully exited.
#[utoipa::path(
    get,
    path = "/stop-loop",
    params(StopParams),
    responses(
        (status = 200, description = "Loop stopping", body = StatusResponse)
    )
)]
pub async fn stop_loop(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StopParams>,
) -> Json<StatusResponse> {
    state.worker.stop(params.broadcast).await;
    Json(StatusResponse::stopping())
}

/// Report the current orchestration state.
#[utoipa::path(
    get,
    path = "/state",
    responses(
        (status = 200, description = "Current state", body = StateResponse)
    )
)]
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    Json(StateResponse::new(StateData {
        mode: state.mode.get(),
        connection_attached: state.broadcaster.is_attached(),
        worker_running: state.worker.is_running().await,
    }))
}

/// Mint a short-lived streaming speech-to-text token for the client.
#[utoipa::path(
    get,
    path = "/token",
    responses(
        (status = 200, description = "Streaming token", body = TokenData),
        (status = 500, description = "Upstream token fetch failed", body = ErrorResponse)
    )
)]
pub async fn get_token(State(state): State<Arc<AppState>>) -> Result<Json<TokenData>, ApiError> {
    let token = state
        .tokens
        .fetch_token()
        .await
        .map_err(|e| ApiError::InternalServerError(e.to_string()))?;
    Ok(Json(TokenData { token }))
}
