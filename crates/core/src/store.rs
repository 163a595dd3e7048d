//! Bounded, insertion-ordered telemetry history with a current snapshot.
//!
//! Entries are appended in chronological order and the oldest are evicted as
//! soon as the retention cap is exceeded, so every query observes the bound.
//! The store itself is not synchronized; [`crate::service::TelemetryService`]
//! owns it behind a single lock.

use std::collections::VecDeque;

use chrono::TimeDelta;
use serde::Serialize;

use crate::alert::Alert;
use crate::error::CoreError;
use crate::history::HistoryEntry;
use crate::reading::SensorReading;
use crate::types::Timestamp;

/// Maximum number of history entries retained (in memory and on disk).
pub const DEFAULT_CAPACITY: usize = 1000;

/// Maximum number of entries returned by a window query.
pub const WINDOW_RESULT_LIMIT: usize = 100;

/// Maximum number of alerts returned by a recent-alerts query.
pub const RECENT_ALERTS_LIMIT: usize = 50;

/// Entries kept by a clear request when the caller does not say otherwise.
pub const DEFAULT_CLEAR_KEEP: usize = 100;

/// The latest reading together with the alerts it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub reading: SensorReading,
    pub alerts: Vec<Alert>,
    pub has_alerts: bool,
}

#[derive(Debug)]
pub struct TelemetryStore {
    /// Oldest first.
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    snapshot: Option<Snapshot>,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TelemetryStore {
    /// Create an empty store. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            snapshot: None,
        }
    }

    /// Rehydrate from persisted history (oldest first), keeping the newest
    /// `capacity` entries. The snapshot stays empty until the next reading.
    pub fn with_history(history: Vec<HistoryEntry>, capacity: usize) -> Self {
        let mut store = Self::new(capacity);
        store.entries.extend(history);
        store.enforce_capacity();
        store
    }

    /// Append an entry at the tail, evicting the oldest entries over the cap.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        self.enforce_capacity();
    }

    /// Append the entry for `reading` and replace the snapshot in one step.
    pub fn record(&mut self, reading: SensorReading, alerts: Vec<Alert>) -> &Snapshot {
        self.append(HistoryEntry::from_reading(&reading, alerts.clone()));
        self.snapshot.insert(Snapshot {
            has_alerts: !alerts.is_empty(),
            reading,
            alerts,
        })
    }

    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Change the mode shown in the current snapshot. History is untouched.
    pub fn set_mode(&mut self, mode: u8) -> Result<&Snapshot, CoreError> {
        let snapshot = self.snapshot.as_mut().ok_or_else(|| {
            CoreError::Conflict("no device reading has been received yet".into())
        })?;
        snapshot.reading.mode = mode;
        Ok(&*snapshot)
    }

    /// Entries newer than `now - hours`, chronological, at most the newest
    /// [`WINDOW_RESULT_LIMIT`].
    pub fn query_by_window(
        &self,
        hours: f64,
        now: Timestamp,
    ) -> Result<Vec<HistoryEntry>, CoreError> {
        let start = window_start(hours, now)?;
        let mut newest: Vec<HistoryEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| in_window(e, start, now))
            .take(WINDOW_RESULT_LIMIT)
            .cloned()
            .collect();
        newest.reverse();
        Ok(newest)
    }

    /// Alerts from entries inside the window, newest first, at most
    /// [`RECENT_ALERTS_LIMIT`]. Ties keep insertion order.
    pub fn recent_alerts(&self, hours: f64, now: Timestamp) -> Result<Vec<Alert>, CoreError> {
        let mut alerts: Vec<Alert> = self
            .window(hours, now)?
            .flat_map(|e| e.alerts.iter().cloned())
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts.truncate(RECENT_ALERTS_LIMIT);
        Ok(alerts)
    }

    /// Every entry inside the window, uncapped, oldest first.
    pub fn window(
        &self,
        hours: f64,
        now: Timestamp,
    ) -> Result<impl Iterator<Item = &HistoryEntry> + '_, CoreError> {
        let start = window_start(hours, now)?;
        Ok(self.entries.iter().filter(move |e| in_window(e, start, now)))
    }

    /// Keep only the newest `keep` entries. Returns how many were removed.
    pub fn clear(&mut self, keep: usize) -> usize {
        let removed = self.entries.len().saturating_sub(keep);
        self.entries.drain(..removed);
        removed
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.entries.iter()
    }

    /// Timestamp of the newest entry.
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.entries.back().map(|e| e.timestamp)
    }

    /// Snapshot time if a reading arrived this run, else the newest entry.
    pub fn last_update(&self) -> Option<Timestamp> {
        self.snapshot
            .as_ref()
            .map(|s| s.reading.timestamp)
            .or_else(|| self.last_timestamp())
    }

    fn enforce_capacity(&mut self) {
        let excess = self.entries.len().saturating_sub(self.capacity);
        if excess > 0 {
            self.entries.drain(..excess);
        }
    }
}

/// Lower (exclusive) bound of a window ending at `now`.
///
/// `Ok(None)` means the window reaches further back than the calendar can
/// express, i.e. every entry qualifies.
pub fn window_start(hours: f64, now: Timestamp) -> Result<Option<Timestamp>, CoreError> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(CoreError::InvalidQueryParameter(format!(
            "hours must be a positive number, got {hours}"
        )));
    }
    let millis = (hours * 3_600_000.0) as i64;
    Ok(TimeDelta::try_milliseconds(millis).and_then(|d| now.checked_sub_signed(d)))
}

fn in_window(entry: &HistoryEntry, start: Option<Timestamp>, now: Timestamp) -> bool {
    entry.timestamp <= now && start.map_or(true, |s| entry.timestamp > s)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
