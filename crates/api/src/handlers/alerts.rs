use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::query::WindowParams;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_ALERT_HOURS: f64 = 6.0;

/// GET /api/alerts?hours=N
///
/// Up to 50 alerts from the window, newest first.
pub async fn list_alerts(
    State(state): State<AppState>,
    params: Result<Query<WindowParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let alerts = state
        .service
        .recent_alerts(params.hours_or(DEFAULT_ALERT_HOURS))
        .await?;
    Ok(Json(DataResponse { data: alerts }))
}
