//! Combined activity feed of readings and alerts.

use serde::Serialize;

use crate::alert::Alert;
use crate::error::CoreError;
use crate::history::HistoryEntry;
use crate::store::{TelemetryStore, RECENT_ALERTS_LIMIT, WINDOW_RESULT_LIMIT};
use crate::types::Timestamp;

/// One line of the activity feed, tagged on the wire by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    SensorData {
        timestamp: Timestamp,
        message: String,
        data: HistoryEntry,
    },
    Alert {
        timestamp: Timestamp,
        message: String,
        data: Alert,
    },
}

impl LogEntry {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::SensorData { timestamp, .. } | Self::Alert { timestamp, .. } => *timestamp,
        }
    }

    fn from_entry(entry: &HistoryEntry) -> Self {
        Self::SensorData {
            timestamp: entry.timestamp,
            message: format!(
                "Sensor data: F={}, L={}, R={}, IR={}",
                entry.front_distance, entry.left_distance, entry.right_distance, entry.ir_distance
            ),
            data: entry.clone(),
        }
    }

    fn from_alert(alert: Alert) -> Self {
        Self::Alert {
            timestamp: alert.timestamp,
            message: format!(
                "Alert: {} at {}: {}",
                alert.kind.as_str(),
                alert.location.as_str(),
                alert.message
            ),
            data: alert,
        }
    }
}

impl TelemetryStore {
    /// Up to [`WINDOW_RESULT_LIMIT`] readings and [`RECENT_ALERTS_LIMIT`]
    /// alerts from the window, merged newest first. On equal timestamps a
    /// reading precedes its alerts.
    pub fn logs(&self, hours: f64, now: Timestamp) -> Result<Vec<LogEntry>, CoreError> {
        let readings = self.query_by_window(hours, now)?;
        let alerts = self.recent_alerts(hours, now)?;

        let mut logs: Vec<LogEntry> = Vec::with_capacity(readings.len() + alerts.len());
        logs.extend(readings.iter().rev().map(LogEntry::from_entry));
        logs.extend(alerts.into_iter().map(LogEntry::from_alert));
        logs.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        Ok(logs)
    }
}
