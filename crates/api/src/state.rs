use std::sync::Arc;

use cane_core::service::TelemetryService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// The single telemetry service instance owning store, snapshot and thresholds.
    pub service: Arc<TelemetryService>,
}
