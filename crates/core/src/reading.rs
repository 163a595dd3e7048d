//! Sensor readings and permissive coercion of device payloads.
//!
//! The cane firmware builds its JSON by hand, so field types drift (for
//! example `power_status` arrives as the string `"true"`). [`ReadingPayload`]
//! is the typed intermediate: every field has an explicit default and an
//! explicit coercion rule, and anything that cannot be coerced is reported as
//! [`CoreError::InvalidPayload`] naming the offending field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::types::{Centimeters, Timestamp};

/// Largest distance accepted from any sensor.
pub const MAX_DISTANCE_CM: Centimeters = 1000.0;

/// Operating mode assumed when the device does not report one.
pub const DEFAULT_MODE: u8 = 1;

/// Battery level assumed when the device does not report one.
pub const DEFAULT_BATTERY_LEVEL: u8 = 100;

/// One accepted, timestamped reading from the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub front_distance: Centimeters,
    pub left_distance: Centimeters,
    pub right_distance: Centimeters,
    pub ir_distance: Centimeters,
    pub mode: u8,
    pub power_status: bool,
    pub battery_level: u8,
    pub wifi_connected: bool,
    /// Received signal strength in dBm, when the device reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_strength: Option<i32>,
    pub timestamp: Timestamp,
}

/// A validated payload that has not been stamped with an ingestion time yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingPayload {
    pub front_distance: Centimeters,
    pub left_distance: Centimeters,
    pub right_distance: Centimeters,
    pub ir_distance: Centimeters,
    pub mode: u8,
    pub power_status: bool,
    pub battery_level: u8,
    pub wifi_connected: bool,
    pub wifi_strength: Option<i32>,
}

impl ReadingPayload {
    /// Parse and coerce a raw device payload.
    ///
    /// Missing or `null` fields take their defaults: distances `0`, `mode = 1`,
    /// `power_status = false`, `battery_level = 100`, `wifi_connected = false`.
    pub fn parse(raw: &Value) -> Result<Self, CoreError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| CoreError::InvalidPayload("payload must be a JSON object".into()))?;

        let mode = integer(obj, "mode")?.unwrap_or(i64::from(DEFAULT_MODE));
        let mode = u8::try_from(mode)
            .ok()
            .filter(|m| *m >= 1)
            .ok_or_else(|| {
                CoreError::InvalidPayload(format!("mode must be between 1 and 255, got {mode}"))
            })?;

        let battery = integer(obj, "battery_level")?.unwrap_or(i64::from(DEFAULT_BATTERY_LEVEL));
        let battery_level = u8::try_from(battery)
            .ok()
            .filter(|b| *b <= 100)
            .ok_or_else(|| {
                CoreError::InvalidPayload(format!(
                    "battery_level must be between 0 and 100, got {battery}"
                ))
            })?;

        let wifi_strength = integer(obj, "wifi_strength")?
            .map(|v| {
                i32::try_from(v).map_err(|_| {
                    CoreError::InvalidPayload(format!("wifi_strength out of range: {v}"))
                })
            })
            .transpose()?;

        Ok(Self {
            front_distance: distance(obj, "front_distance")?,
            left_distance: distance(obj, "left_distance")?,
            right_distance: distance(obj, "right_distance")?,
            ir_distance: distance(obj, "ir_distance")?,
            mode,
            power_status: flag(obj, "power_status")?.unwrap_or(false),
            battery_level,
            wifi_connected: flag(obj, "wifi_connected")?.unwrap_or(false),
            wifi_strength,
        })
    }

    /// Stamp the payload with its ingestion time.
    pub fn into_reading(self, timestamp: Timestamp) -> SensorReading {
        SensorReading {
            front_distance: self.front_distance,
            left_distance: self.left_distance,
            right_distance: self.right_distance,
            ir_distance: self.ir_distance,
            mode: self.mode,
            power_status: self.power_status,
            battery_level: self.battery_level,
            wifi_connected: self.wifi_connected,
            wifi_strength: self.wifi_strength,
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Coercion helpers
// ---------------------------------------------------------------------------

/// Look up a field, treating `null` the same as absent.
fn present<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|v| !v.is_null())
}

fn invalid(name: &str, expected: &str, value: &Value) -> CoreError {
    CoreError::InvalidPayload(format!("{name} must be {expected}, got {value}"))
}

/// Coerce a distance field: numbers or numeric strings, `0..=MAX_DISTANCE_CM`.
fn distance(obj: &Map<String, Value>, name: &str) -> Result<Centimeters, CoreError> {
    let Some(value) = present(obj, name) else {
        return Ok(0.0);
    };
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| invalid(name, "a number", value))?;

    if !(0.0..=MAX_DISTANCE_CM).contains(&parsed) {
        return Err(CoreError::InvalidPayload(format!(
            "{name} must be between 0 and {MAX_DISTANCE_CM}, got {parsed}"
        )));
    }
    Ok(parsed)
}

/// Coerce an integer field. Reals truncate toward zero; booleans map to 1/0.
fn integer(obj: &Map<String, Value>, name: &str) -> Result<Option<i64>, CoreError> {
    let Some(value) = present(obj, name) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| invalid(name, "an integer", value))
}

/// Coerce a boolean flag from booleans, numbers or common string spellings.
fn flag(obj: &Map<String, Value>, name: &str) -> Result<Option<bool>, CoreError> {
    let Some(value) = present(obj, name) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| invalid(name, "a boolean", value))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
