use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use cane_core::error::CoreError;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: u8,
}

/// POST /api/device/mode
///
/// Change the mode shown in the current snapshot. History is not touched.
/// Returns 409 before the first reading has been received.
pub async fn set_mode(
    State(state): State<AppState>,
    body: Result<Json<ModeRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = body.map_err(|rejection| match rejection {
        JsonRejection::JsonDataError(e) => {
            AppError::Core(CoreError::InvalidPayload(e.body_text()))
        }
        other => AppError::from(other),
    })?;

    let snapshot = state.service.set_mode(request.mode).await?;
    Ok(Json(DataResponse { data: snapshot }))
}
