//! `GET /` handler.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::Level;

use crate::log_correlated;
use crate::now_secs;
use crate::service::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub service: String,
    pub message: String,
    /// Seconds since the Unix epoch, with sub-second precision.
    pub timestamp: f64,
}

/// Handle GET / - greeting plus the current time.
pub async fn handle_root(State(state): State<AppState>) -> Result<Json<RootResponse>, Infallible> {
    let identity = &state.identity;
    state
        .telemetry
        .run_traced("root_handler", "GET", "/", async {
            log_correlated!(Level::INFO, "Processing root request");
            Ok(Json(RootResponse {
                service: identity.label.clone(),
                message: identity.greeting.clone(),
                timestamp: now_secs(),
            }))
        })
        .await
}
