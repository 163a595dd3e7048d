use axum::routing::get;
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;

/// Alert routes mounted at `/alerts`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(alerts::list_alerts))
}
