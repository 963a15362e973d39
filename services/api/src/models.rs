//! Control-Plane Response Models
//!
//! Every successful control-plane response is wrapped in the `{ok, data}`
//! envelope the browser client expects. These structs double as the `utoipa`
//! schemas for the generated OpenAPI documentation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use vigil_core::mode::Mode;

/// Body of a successful `/start-loop` or `/stop-loop` call.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct StatusData {
    #[schema(example = "started")]
    pub status: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct StatusResponse {
    pub ok: bool,
    pub data: StatusData,
}

impl StatusResponse {
    pub fn started() -> Self {
        Self {
            ok: true,
            data: StatusData {
                status: "started".to_string(),
            },
        }
    }

    pub fn stopping() -> Self {
        Self {
            ok: true,
            data: StatusData {
                status: "stopping".to_string(),
            },
        }
    }
}

/// Snapshot of the orchestration state reported by `/state`.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct StateData {
    #[schema(value_type = String, example = "idle")]
    pub mode: Mode,
    pub connection_attached: bool,
    pub worker_running: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct StateResponse {
    pub ok: bool,
    pub data: StateData,
}

impl StateResponse {
    pub fn new(data: StateData) -> Self {
        Self { ok: true, data }
    }
}

/// Body of a successful `/token` call.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct TokenData {
    pub token: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
