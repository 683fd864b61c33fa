//! Liveness of the relay process

use crate::state::AppState;
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Relay liveness; says nothing about the backend's health
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Backend base URL relayed calls resolve against
    pub backend: String,
    /// Number of configured allow-list prefixes
    pub allowed_prefixes: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Relay is accepting requests", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: app_state.config.base_url().to_string(),
        allowed_prefixes: app_state.config.allowed_prefixes.len(),
    })
}

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(health))
}
