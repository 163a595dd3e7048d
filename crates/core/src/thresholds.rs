//! Operator-tunable distance thresholds used by the alert classifier.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Centimeters;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Obstacles closer than this raise a danger alert (front sensor).
pub const DEFAULT_DANGER_DISTANCE: Centimeters = 25.0;

/// Obstacles closer than this raise a warning alert.
pub const DEFAULT_WARN_DISTANCE: Centimeters = 50.0;

/// Distance considered clear of obstacles.
pub const DEFAULT_SAFE_DISTANCE: Centimeters = 80.0;

/// IR readings below this indicate uneven ground.
pub const DEFAULT_IR_GROUND: Centimeters = 20.0;

/// IR readings above this indicate a hole or a step down.
pub const DEFAULT_IR_HOLE: Centimeters = 40.0;

// ---------------------------------------------------------------------------
// ThresholdConfig
// ---------------------------------------------------------------------------

/// The active set of thresholds.
///
/// Invariant: every field is finite and positive, and
/// `danger_distance < warn_distance < safe_distance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub danger_distance: Centimeters,
    pub warn_distance: Centimeters,
    pub safe_distance: Centimeters,
    pub ir_ground: Centimeters,
    pub ir_hole: Centimeters,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            danger_distance: DEFAULT_DANGER_DISTANCE,
            warn_distance: DEFAULT_WARN_DISTANCE,
            safe_distance: DEFAULT_SAFE_DISTANCE,
            ir_ground: DEFAULT_IR_GROUND,
            ir_hole: DEFAULT_IR_HOLE,
        }
    }
}

/// A partial settings update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThresholdUpdate {
    pub danger_distance: Option<Centimeters>,
    pub warn_distance: Option<Centimeters>,
    pub safe_distance: Option<Centimeters>,
    pub ir_ground: Option<Centimeters>,
    pub ir_hole: Option<Centimeters>,
}

impl ThresholdUpdate {
    /// True when the update carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.danger_distance.is_none()
            && self.warn_distance.is_none()
            && self.safe_distance.is_none()
            && self.ir_ground.is_none()
            && self.ir_hole.is_none()
    }
}

impl ThresholdConfig {
    /// Merge `update` into a copy of `self` and validate the result.
    ///
    /// `self` is left untouched; the caller swaps in the returned value only
    /// on success, so a rejected update never partially applies.
    pub fn merged(&self, update: &ThresholdUpdate) -> Result<Self, CoreError> {
        let merged = self.with_update(update);
        merged.validate()?;
        Ok(merged)
    }

    /// Overlay `update` without validating. Used when rehydrating stored
    /// settings, which are validated by whoever adopts them.
    pub fn with_update(&self, update: &ThresholdUpdate) -> Self {
        Self {
            danger_distance: update.danger_distance.unwrap_or(self.danger_distance),
            warn_distance: update.warn_distance.unwrap_or(self.warn_distance),
            safe_distance: update.safe_distance.unwrap_or(self.safe_distance),
            ir_ground: update.ir_ground.unwrap_or(self.ir_ground),
            ir_hole: update.ir_hole.unwrap_or(self.ir_hole),
        }
    }

    /// Check positivity and the distance ordering invariant.
    pub fn validate(&self) -> Result<(), CoreError> {
        let fields = [
            ("danger_distance", self.danger_distance),
            ("warn_distance", self.warn_distance),
            ("safe_distance", self.safe_distance),
            ("ir_ground", self.ir_ground),
            ("ir_hole", self.ir_hole),
        ];
        for (name, value) in fields {
            validate_positive(value, name)?;
        }

        if !(self.danger_distance < self.warn_distance && self.warn_distance < self.safe_distance)
        {
            return Err(CoreError::ConfigUpdate(format!(
                "thresholds must satisfy danger_distance < warn_distance < safe_distance, \
                 got {} / {} / {}",
                self.danger_distance, self.warn_distance, self.safe_distance
            )));
        }
        Ok(())
    }
}

/// Reject NaN, infinities, zero and negative values.
fn validate_positive(value: f64, name: &str) -> Result<(), CoreError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::ConfigUpdate(format!(
            "{name} must be a positive number, got {value}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
