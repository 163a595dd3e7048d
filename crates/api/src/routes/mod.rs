pub mod alerts;
pub mod data;
pub mod device;
pub mod health;
pub mod logs;
pub mod settings;
pub mod system;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /data/current                    latest snapshot (GET)
/// /data/receive                    ingest one reading (POST)
/// /data/history                    windowed history (GET, ?hours=24)
/// /data/statistics                 windowed statistics (GET, ?hours=24)
///
/// /alerts                          recent alerts (GET, ?hours=6)
///
/// /logs                            readings and alerts merged (GET, ?hours=24)
///
/// /settings                        get, update thresholds (GET, POST)
///
/// /device/mode                     set snapshot mode (POST)
///
/// /system/info                     store size and ingest counters (GET)
/// /system/clear                    truncate history (POST, ?keep=100)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/data", data::router())
        .nest("/alerts", alerts::router())
        .nest("/logs", logs::router())
        .nest("/settings", settings::router())
        .nest("/device", device::router())
        .nest("/system", system::router())
}
