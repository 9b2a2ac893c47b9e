//! `GET /error` handler.
//!
//! Always answers 500. The failure is manufactured: the body does not return
//! `Err`, it marks the request as failed with [`mark_error`] and builds the
//! error response itself.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::Level;

use crate::log_correlated;
use crate::observability::traced::mark_error;
use crate::service::AppState;

pub const SIMULATED_ERROR: &str = "This is a simulated error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handle GET /error - simulated failure.
pub async fn handle_error(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ErrorResponse>), Infallible> {
    state
        .telemetry
        .run_traced("error_handler", "GET", "/error", async {
            log_correlated!(
                Level::ERROR,
                error_type = "SimulatedError",
                "Simulated error occurred"
            );
            mark_error(SIMULATED_ERROR);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: SIMULATED_ERROR.to_string(),
                }),
            ))
        })
        .await
}
