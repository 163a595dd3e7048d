//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Time-window parameters (`?hours=`).
///
/// Handlers supply their own default; validation of the value itself happens
/// in the core store so every window query rejects the same inputs.
#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    pub hours: Option<f64>,
}

impl WindowParams {
    pub fn hours_or(&self, default: f64) -> f64 {
        self.hours.unwrap_or(default)
    }
}

/// Parameters for `POST /api/system/clear` (`?keep=`).
#[derive(Debug, Default, Deserialize)]
pub struct ClearParams {
    pub keep: Option<usize>,
}
