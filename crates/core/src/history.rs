//! History entries: one per accepted reading.

use serde::{Deserialize, Serialize};

use crate::alert::Alert;
use crate::reading::SensorReading;
use crate::types::{Centimeters, Timestamp};

/// An immutable record of one accepted reading and the alerts it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(deserialize_with = "crate::types::deserialize_timestamp")]
    pub timestamp: Timestamp,
    pub front_distance: Centimeters,
    pub left_distance: Centimeters,
    pub right_distance: Centimeters,
    pub ir_distance: Centimeters,
    pub mode: u8,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

impl HistoryEntry {
    /// Build the entry for `reading`, taking ownership of its alerts.
    pub fn from_reading(reading: &SensorReading, alerts: Vec<Alert>) -> Self {
        Self {
            timestamp: reading.timestamp,
            front_distance: reading.front_distance,
            left_distance: reading.left_distance,
            right_distance: reading.right_distance,
            ir_distance: reading.ir_distance,
            mode: reading.mode,
            alerts,
        }
    }
}
