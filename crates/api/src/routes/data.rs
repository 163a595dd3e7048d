use axum::routing::{get, post};
use axum::Router;

use crate::handlers::telemetry;
use crate::state::AppState;

/// Telemetry routes mounted at `/data`.
///
/// ```text
/// GET  /current     -> get_current
/// POST /receive     -> receive_data
/// GET  /history     -> get_history
/// GET  /statistics  -> get_statistics
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/current", get(telemetry::get_current))
        .route("/receive", post(telemetry::receive_data))
        .route("/history", get(telemetry::get_history))
        .route("/statistics", get(telemetry::get_statistics))
}
