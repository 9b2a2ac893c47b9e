//! `GET /data` handler.
//!
//! Fabricates a fixed set of rows behind a simulated database call.

use axum::extract::State;
use axum::Json;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::ops::Range;
use std::time::Duration;
use tracing::Level;

use crate::log_correlated;
use crate::service::AppState;

/// Number of rows returned by every query.
pub const ITEM_COUNT: u32 = 10;

/// Simulated query latency bounds, in seconds (upper bound exclusive).
const QUERY_LATENCY_SECS: Range<f64> = 0.01..0.1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub value: String,
}

impl Item {
    fn new(id: u32) -> Self {
        Self {
            id,
            value: format!("item-{id}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse {
    pub data: Vec<Item>,
    pub count: usize,
}

/// Handle GET /data - rows from the simulated query.
pub async fn handle_data(State(state): State<AppState>) -> Result<Json<DataResponse>, Infallible> {
    let telemetry = &state.telemetry;
    telemetry
        .run_traced("get_data_handler", "GET", "/data", async {
            log_correlated!(Level::INFO, "Fetching data");

            let data = telemetry.in_span("database_query", query_items()).await;

            log_correlated!(
                Level::INFO,
                item_count = data.len(),
                "Retrieved {} items",
                data.len()
            );
            Ok(Json(DataResponse {
                count: data.len(),
                data,
            }))
        })
        .await
}

/// Emulate I/O latency, then synthesize the rows.
async fn query_items() -> Vec<Item> {
    let delay = rand::thread_rng().gen_range(QUERY_LATENCY_SECS);
    tokio::time::sleep(Duration::from_secs_f64(delay)).await;
    (0..ITEM_COUNT).map(Item::new).collect()
}
