use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::query::WindowParams;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_LOG_HOURS: f64 = 24.0;

/// GET /api/logs?hours=N
///
/// Up to 100 readings and 50 alerts from the window as one feed, newest first.
pub async fn list_logs(
    State(state): State<AppState>,
    params: Result<Query<WindowParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let logs = state
        .service
        .logs(params.hours_or(DEFAULT_LOG_HOURS))
        .await?;
    Ok(Json(DataResponse { data: logs }))
}
