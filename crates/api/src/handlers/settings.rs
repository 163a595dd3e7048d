//! Handlers for the alert threshold settings.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use cane_core::error::CoreError;
use cane_core::thresholds::ThresholdUpdate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let thresholds = state.service.thresholds().await;
    Ok(Json(DataResponse { data: thresholds }))
}

/// POST /api/settings
///
/// Merge the provided threshold fields into the active config and persist
/// best-effort. Omitted fields keep their current values.
pub async fn update_settings(
    State(state): State<AppState>,
    body: Result<Json<ThresholdUpdate>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(update) = body.map_err(|rejection| match rejection {
        JsonRejection::JsonDataError(e) => {
            AppError::Core(CoreError::ConfigUpdate(e.body_text()))
        }
        other => AppError::from(other),
    })?;

    if update.is_empty() {
        return Err(CoreError::ConfigUpdate("no threshold fields provided".into()).into());
    }

    let thresholds = state.service.update_thresholds(&update).await?;
    state.service.persist_best_effort().await;

    Ok(Json(DataResponse { data: thresholds }))
}
