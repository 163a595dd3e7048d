use axum::routing::{get, post};
use axum::Router;

use crate::handlers::system;
use crate::state::AppState;

/// System routes mounted at `/system`.
///
/// ```text
/// GET  /info   -> system_info
/// POST /clear  -> clear_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/info", get(system::system_info))
        .route("/clear", post(system::clear_history))
}
