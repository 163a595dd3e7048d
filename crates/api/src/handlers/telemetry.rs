//! Handlers for device telemetry: ingest, current snapshot, history and
//! statistics.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;

use crate::error::AppResult;
use crate::query::WindowParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Default window for history and statistics queries.
const DEFAULT_HISTORY_HOURS: f64 = 24.0;

/// GET /api/data/current
///
/// Latest reading with its alerts, the active thresholds and the history size.
/// `snapshot` is `null` until the first reading after startup.
pub async fn get_current(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let view = state.service.current().await;
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/data/receive
///
/// Ingest one raw reading from the device. The body is taken as untyped JSON
/// so field-level coercion errors name the offending field.
pub async fn receive_data(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(raw) = body?;
    let summary = state.service.ingest(&raw).await?;

    if summary.alerts > 0 {
        tracing::info!(alerts = summary.alerts, "Reading raised alerts");
    }

    Ok(Json(DataResponse { data: summary }))
}

/// GET /api/data/history?hours=N
///
/// Up to the 100 most recent entries inside the window, oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    params: Result<Query<WindowParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let entries = state
        .service
        .history(params.hours_or(DEFAULT_HISTORY_HOURS))
        .await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/data/statistics?hours=N
pub async fn get_statistics(
    State(state): State<AppState>,
    params: Result<Query<WindowParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(params) = params?;
    let stats = state
        .service
        .statistics(params.hours_or(DEFAULT_HISTORY_HOURS))
        .await?;
    Ok(Json(DataResponse { data: stats }))
}
