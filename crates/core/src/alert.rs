//! Alert types produced by the classifier and attached to history entries.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Severity of a classified hazard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Immediate hazard: obstacle inside the danger band or a hole ahead.
    Danger,
    /// Obstacle inside the warning band.
    Warning,
    /// Informational signal such as uneven ground.
    Info,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Danger => "danger",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// Which sensor raised the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLocation {
    Front,
    Left,
    Right,
    /// The downward-facing IR ground sensor.
    Bottom,
}

impl AlertLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Left => "left",
            Self::Right => "right",
            Self::Bottom => "bottom",
        }
    }
}

/// A single classified alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Serialized as `type` for compatibility with the dashboard client.
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub location: AlertLocation,
    /// Human-readable text, may embed the triggering distance.
    pub message: String,
    /// Evaluation time of the reading that produced this alert.
    #[serde(deserialize_with = "crate::types::deserialize_timestamp")]
    pub timestamp: Timestamp,
}
