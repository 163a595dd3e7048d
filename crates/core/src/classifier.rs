//! Threshold classification of sensor readings.
//!
//! Pure logic: the caller supplies the reading, the thresholds in force and
//! the evaluation timestamp. Each sensor is checked independently; within a
//! sensor the first matching band wins.

use crate::alert::{Alert, AlertKind, AlertLocation};
use crate::reading::SensorReading;
use crate::thresholds::ThresholdConfig;
use crate::types::Timestamp;

/// Classify `reading` against `cfg`.
///
/// Alerts are returned in sensor order: front, left, right, bottom. A distance
/// of exactly `0` on a ranging sensor means "no echo" and never alerts.
pub fn classify(
    reading: &SensorReading,
    cfg: &ThresholdConfig,
    timestamp: Timestamp,
) -> Vec<Alert> {
    let mut alerts = Vec::with_capacity(4);
    let alert = |kind, location, message: String| Alert {
        kind,
        location,
        message,
        timestamp,
    };

    let front = reading.front_distance;
    if 0.0 < front && front < cfg.danger_distance {
        alerts.push(alert(
            AlertKind::Danger,
            AlertLocation::Front,
            format!("Obstacle ahead: {front}cm"),
        ));
    } else if cfg.danger_distance <= front && front < cfg.warn_distance {
        alerts.push(alert(
            AlertKind::Warning,
            AlertLocation::Front,
            format!("Caution ahead: {front}cm"),
        ));
    }

    let left = reading.left_distance;
    if 0.0 < left && left < cfg.warn_distance {
        alerts.push(alert(
            AlertKind::Warning,
            AlertLocation::Left,
            format!("Object on the left: {left}cm"),
        ));
    }

    let right = reading.right_distance;
    if 0.0 < right && right < cfg.warn_distance {
        alerts.push(alert(
            AlertKind::Warning,
            AlertLocation::Right,
            format!("Object on the right: {right}cm"),
        ));
    }

    // IR polarity is inverted: a short reading means the ground is close and
    // bumpy, a long one means the ground dropped away.
    let ir = reading.ir_distance;
    if ir < cfg.ir_ground {
        alerts.push(alert(
            AlertKind::Info,
            AlertLocation::Bottom,
            "Uneven ground".to_string(),
        ));
    } else if ir > cfg.ir_hole {
        alerts.push(alert(
            AlertKind::Danger,
            AlertLocation::Bottom,
            format!("Hole or step detected: {ir}cm"),
        ));
    }

    alerts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    /// A reading with every ranging sensor clear and the IR sensor in band.
    fn clear_reading() -> SensorReading {
        SensorReading {
            front_distance: 0.0,
            left_distance: 0.0,
            right_distance: 0.0,
            ir_distance: 30.0,
            mode: 1,
            power_status: true,
            battery_level: 100,
            wifi_connected: true,
            wifi_strength: None,
            timestamp: Utc::now(),
        }
    }

    fn classify_default(reading: &SensorReading) -> Vec<Alert> {
        classify(reading, &ThresholdConfig::default(), reading.timestamp)
    }

    #[test]
    fn clear_reading_has_no_alerts() {
        assert!(classify_default(&clear_reading()).is_empty());
    }

    #[test]
    fn front_inside_danger_band() {
        let reading = SensorReading {
            front_distance: 10.0,
            ..clear_reading()
        };
        let alerts = classify_default(&reading);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Danger);
        assert_eq!(alerts[0].location, AlertLocation::Front);
        assert!(alerts[0].message.contains("10"));
    }

    #[test]
    fn front_inside_warning_band() {
        let reading = SensorReading {
            front_distance: 30.0,
            ..clear_reading()
        };
        let alerts = classify_default(&reading);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Warning);
        assert_eq!(alerts[0].location, AlertLocation::Front);
    }

    #[test]
    fn front_on_danger_boundary_is_warning() {
        let reading = SensorReading {
            front_distance: 25.0,
            ..clear_reading()
        };
        let alerts = classify_default(&reading);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Warning);
    }

    #[test]
    fn front_on_warn_boundary_is_clear() {
        let reading = SensorReading {
            front_distance: 50.0,
            ..clear_reading()
        };
        assert!(classify_default(&reading).is_empty());
    }

    #[test]
    fn zero_front_never_alerts() {
        let reading = clear_reading();
        let tight = ThresholdConfig {
            danger_distance: 0.5,
            warn_distance: 1.0,
            safe_distance: 2.0,
            ..ThresholdConfig::default()
        };
        let wide = ThresholdConfig {
            danger_distance: 500.0,
            warn_distance: 900.0,
            safe_distance: 1000.0,
            ..ThresholdConfig::default()
        };
        for cfg in [ThresholdConfig::default(), tight, wide] {
            let alerts = classify(&reading, &cfg, reading.timestamp);
            assert!(alerts.iter().all(|a| a.location != AlertLocation::Front));
        }
    }

    #[test]
    fn side_sensors_warn_inside_warn_band() {
        let reading = SensorReading {
            left_distance: 10.0,
            right_distance: 49.0,
            ..clear_reading()
        };
        let alerts = classify_default(&reading);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].location, AlertLocation::Left);
        assert_eq!(alerts[1].location, AlertLocation::Right);
        assert!(alerts.iter().all(|a| a.kind == AlertKind::Warning));
    }

    #[test]
    fn ir_above_hole_threshold_is_single_danger() {
        let reading = SensorReading {
            ir_distance: 45.0,
            ..clear_reading()
        };
        let alerts = classify_default(&reading);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Danger);
        assert_eq!(alerts[0].location, AlertLocation::Bottom);
        assert!(alerts[0].message.contains("45"));
    }

    #[test]
    fn ir_below_ground_threshold_is_info() {
        let reading = SensorReading {
            ir_distance: 5.0,
            ..clear_reading()
        };
        let alerts = classify_default(&reading);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Info);
        assert_eq!(alerts[0].location, AlertLocation::Bottom);
    }

    #[test]
    fn all_sensors_alert_in_fixed_order() {
        let reading = SensorReading {
            front_distance: 5.0,
            left_distance: 5.0,
            right_distance: 5.0,
            ir_distance: 100.0,
            ..clear_reading()
        };
        let alerts = classify_default(&reading);
        let locations: Vec<_> = alerts.iter().map(|a| a.location).collect();
        assert_eq!(
            locations,
            vec![
                AlertLocation::Front,
                AlertLocation::Left,
                AlertLocation::Right,
                AlertLocation::Bottom
            ]
        );
    }

    #[test]
    fn alerts_carry_evaluation_timestamp() {
        let reading = SensorReading {
            front_distance: 5.0,
            ..clear_reading()
        };
        let at = reading.timestamp - chrono::Duration::minutes(3);
        let alerts = classify(&reading, &ThresholdConfig::default(), at);
        assert_eq!(alerts[0].timestamp, at);
    }
}
