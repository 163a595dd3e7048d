use axum::routing::post;
use axum::Router;

use crate::handlers::device;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/mode", post(device::set_mode))
}
