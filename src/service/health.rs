//! `GET /health` liveness probe. Not traced.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::service::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// Handle GET /health - basic liveness check.
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.identity.service_name.clone(),
    })
}
