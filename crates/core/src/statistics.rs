//! Aggregate statistics over a history window.

use serde::Serialize;

use crate::error::CoreError;
use crate::store::TelemetryStore;
use crate::types::{Centimeters, Timestamp};

/// Averages and extremes of the readings inside a window.
///
/// Averages are `0` and instants are `None` when the window is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStatistics {
    pub total_readings: usize,
    pub avg_front: Centimeters,
    pub avg_left: Centimeters,
    pub avg_right: Centimeters,
    pub avg_ir: Centimeters,
    pub min_front: Option<Centimeters>,
    pub max_front: Option<Centimeters>,
    pub first_reading: Option<Timestamp>,
    pub last_reading: Option<Timestamp>,
    pub time_period_hours: f64,
}

impl TelemetryStore {
    /// Compute statistics over every entry inside the window (not capped).
    pub fn statistics(&self, hours: f64, now: Timestamp) -> Result<WindowStatistics, CoreError> {
        let mut stats = WindowStatistics {
            total_readings: 0,
            avg_front: 0.0,
            avg_left: 0.0,
            avg_right: 0.0,
            avg_ir: 0.0,
            min_front: None,
            max_front: None,
            first_reading: None,
            last_reading: None,
            time_period_hours: hours,
        };

        let (mut front, mut left, mut right, mut ir) = (0.0, 0.0, 0.0, 0.0);
        for entry in self.window(hours, now)? {
            stats.total_readings += 1;
            front += entry.front_distance;
            left += entry.left_distance;
            right += entry.right_distance;
            ir += entry.ir_distance;
            let f = entry.front_distance;
            stats.min_front = Some(stats.min_front.map_or(f, |m| m.min(f)));
            stats.max_front = Some(stats.max_front.map_or(f, |m| m.max(f)));
            stats.first_reading.get_or_insert(entry.timestamp);
            stats.last_reading = Some(entry.timestamp);
        }

        if stats.total_readings > 0 {
            let n = stats.total_readings as f64;
            stats.avg_front = front / n;
            stats.avg_left = left / n;
            stats.avg_right = right / n;
            stats.avg_ir = ir / n;
        }
        Ok(stats)
    }
}
