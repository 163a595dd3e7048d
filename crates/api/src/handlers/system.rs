use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use cane_core::store::DEFAULT_CLEAR_KEEP;

use crate::error::AppResult;
use crate::query::ClearParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/system/info
pub async fn system_info(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let info = state.service.system_info().await;
    Ok(Json(DataResponse { data: info }))
}

/// POST /api/system/clear?keep=N
///
/// Keep only the newest `keep` entries (default 100) and persist best-effort.
pub async fn clear_history(
    State(state): State<AppState>,
    params: Result<Query<ClearParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let outcome = state
        .service
        .clear(params.keep.unwrap_or(DEFAULT_CLEAR_KEEP))
        .await;

    if outcome.removed > 0 {
        state.service.persist_best_effort().await;
    }

    Ok(Json(DataResponse { data: outcome }))
}
