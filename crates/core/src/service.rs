//! Telemetry ingestion service.
//!
//! [`TelemetryService`] owns the history store, the snapshot and the active
//! thresholds behind one [`RwLock`], so an append and its snapshot update are
//! observed together and classification always sees a consistent config.
//!
//! Persistence follows a copy-then-release-then-write pattern: the state is
//! cloned under the read lock, the lock is dropped, and only then is the
//! repository called. Flushes are serialized by a separate mutex so an older
//! copy can never overwrite a newer one.

use std::sync::Arc;

use chrono::{DurationRound, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::alert::Alert;
use crate::classifier::classify;
use crate::error::CoreError;
use crate::history::HistoryEntry;
use crate::logs::LogEntry;
use crate::persistence::{PersistedState, TelemetryRepository};
use crate::reading::ReadingPayload;
use crate::statistics::WindowStatistics;
use crate::store::{Snapshot, TelemetryStore, DEFAULT_CAPACITY};
use crate::thresholds::{ThresholdConfig, ThresholdUpdate};
use crate::types::Timestamp;

/// Flush after every this many successful ingests.
pub const DEFAULT_FLUSH_EVERY: u64 = 10;

/// Tunables for [`TelemetryService`].
#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    /// Retention cap of the history store.
    pub capacity: usize,
    /// Count-based flush cadence; `0` disables count-based flushing.
    pub flush_every: u64,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            flush_every: DEFAULT_FLUSH_EVERY,
        }
    }
}

/// Result of a successful ingest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    /// Number of alerts the reading produced.
    pub alerts: usize,
    /// Accepted ingestion timestamp.
    pub timestamp: Timestamp,
}

/// Everything the dashboard's "current" view needs in one consistent read.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentView {
    pub snapshot: Option<Snapshot>,
    pub settings: ThresholdConfig,
    pub history_count: usize,
    pub server_time: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub data_points: usize,
    pub capacity: usize,
    pub last_update: Option<Timestamp>,
    pub ingested_since_start: u64,
    pub last_flush: Option<Timestamp>,
    pub storage_backend: &'static str,
    pub server_time: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearOutcome {
    pub removed: usize,
    pub remaining: usize,
}

/// State guarded by the service lock.
#[derive(Debug)]
struct TelemetryState {
    store: TelemetryStore,
    thresholds: ThresholdConfig,
    /// Successful ingests since process start.
    ingested: u64,
    /// Bumped on every mutation that changes persisted data.
    generation: u64,
    /// Generation last written to the repository.
    flushed_generation: u64,
    last_flush: Option<Timestamp>,
}

pub struct TelemetryService {
    state: RwLock<TelemetryState>,
    flush_lock: Mutex<()>,
    repository: Arc<dyn TelemetryRepository>,
    options: ServiceOptions,
}

impl TelemetryService {
    /// Create a service with an empty store and default thresholds.
    pub fn new(repository: Arc<dyn TelemetryRepository>, options: ServiceOptions) -> Self {
        Self::from_persisted(repository, options, PersistedState::default())
    }

    /// Rehydrate from `repository`.
    ///
    /// A failed load is logged and the service starts empty; storage problems
    /// never prevent the process from serving.
    pub async fn load(repository: Arc<dyn TelemetryRepository>, options: ServiceOptions) -> Self {
        let persisted = match repository.load().await {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    backend = repository.backend(),
                    "Failed to load persisted telemetry, starting empty"
                );
                PersistedState::default()
            }
        };
        tracing::info!(
            entries = persisted.history.len(),
            stored_settings = persisted.thresholds.is_some(),
            backend = repository.backend(),
            "Telemetry state loaded"
        );
        Self::from_persisted(repository, options, persisted)
    }

    fn from_persisted(
        repository: Arc<dyn TelemetryRepository>,
        options: ServiceOptions,
        persisted: PersistedState,
    ) -> Self {
        let thresholds = match persisted.thresholds {
            Some(stored) => match stored.validate() {
                Ok(()) => stored,
                Err(e) => {
                    tracing::warn!(error = %e, "Stored thresholds are invalid, using defaults");
                    ThresholdConfig::default()
                }
            },
            None => ThresholdConfig::default(),
        };

        Self {
            state: RwLock::new(TelemetryState {
                store: TelemetryStore::with_history(persisted.history, options.capacity),
                thresholds,
                ingested: 0,
                generation: 0,
                flushed_generation: 0,
                last_flush: None,
            }),
            flush_lock: Mutex::new(()),
            repository,
            options,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.repository.backend()
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Validate, classify and record one raw device payload.
    ///
    /// Every `flush_every`-th success triggers a best-effort flush after the
    /// state lock is released; a failing flush does not fail the ingest.
    pub async fn ingest(&self, raw: &serde_json::Value) -> Result<IngestSummary, CoreError> {
        let payload = ReadingPayload::parse(raw)?;

        let (summary, flush_due) = {
            let mut state = self.state.write().await;

            // Microsecond precision so every backend stores the same instant.
            // Keep history chronological even if the wall clock steps back.
            let raw_now = Utc::now();
            let now = raw_now
                .duration_trunc(TimeDelta::microseconds(1))
                .unwrap_or(raw_now);
            let timestamp = state
                .store
                .last_timestamp()
                .map_or(now, |last| now.max(last));

            let reading = payload.into_reading(timestamp);
            let alerts = classify(&reading, &state.thresholds, timestamp);
            let summary = IngestSummary {
                alerts: alerts.len(),
                timestamp,
            };
            state.store.record(reading, alerts);
            state.ingested += 1;
            state.generation += 1;

            let every = self.options.flush_every;
            (summary, every > 0 && state.ingested % every == 0)
        };

        tracing::debug!(
            alerts = summary.alerts,
            timestamp = %summary.timestamp,
            "Reading ingested"
        );

        if flush_due {
            self.persist_best_effort().await;
        }
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn current(&self) -> CurrentView {
        let state = self.state.read().await;
        CurrentView {
            snapshot: state.store.current_snapshot().cloned(),
            settings: state.thresholds,
            history_count: state.store.count(),
            server_time: Utc::now(),
        }
    }

    pub async fn history(&self, hours: f64) -> Result<Vec<HistoryEntry>, CoreError> {
        self.state.read().await.store.query_by_window(hours, Utc::now())
    }

    pub async fn recent_alerts(&self, hours: f64) -> Result<Vec<Alert>, CoreError> {
        self.state.read().await.store.recent_alerts(hours, Utc::now())
    }

    pub async fn logs(&self, hours: f64) -> Result<Vec<LogEntry>, CoreError> {
        self.state.read().await.store.logs(hours, Utc::now())
    }

    pub async fn statistics(&self, hours: f64) -> Result<WindowStatistics, CoreError> {
        self.state.read().await.store.statistics(hours, Utc::now())
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.store.count()
    }

    pub async fn thresholds(&self) -> ThresholdConfig {
        self.state.read().await.thresholds
    }

    pub async fn system_info(&self) -> SystemInfo {
        let state = self.state.read().await;
        SystemInfo {
            data_points: state.store.count(),
            capacity: state.store.capacity(),
            last_update: state.store.last_update(),
            ingested_since_start: state.ingested,
            last_flush: state.last_flush,
            storage_backend: self.repository.backend(),
            server_time: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Operator actions
    // -----------------------------------------------------------------------

    /// Merge a partial settings update. Only the in-memory config changes;
    /// the caller decides whether to persist.
    pub async fn update_thresholds(
        &self,
        update: &ThresholdUpdate,
    ) -> Result<ThresholdConfig, CoreError> {
        let mut state = self.state.write().await;
        let merged = state.thresholds.merged(update)?;
        if merged != state.thresholds {
            state.thresholds = merged;
            state.generation += 1;
            tracing::info!(?merged, "Thresholds updated");
        }
        Ok(merged)
    }

    /// Change the mode shown in the current snapshot.
    pub async fn set_mode(&self, mode: u8) -> Result<Snapshot, CoreError> {
        if mode == 0 {
            return Err(CoreError::InvalidPayload("mode must be at least 1".into()));
        }
        let mut state = self.state.write().await;
        let snapshot = state.store.set_mode(mode)?.clone();
        tracing::info!(mode, "Device mode changed");
        Ok(snapshot)
    }

    /// Keep only the newest `keep` history entries.
    pub async fn clear(&self, keep: usize) -> ClearOutcome {
        let mut state = self.state.write().await;
        let removed = state.store.clear(keep);
        if removed > 0 {
            state.generation += 1;
        }
        let outcome = ClearOutcome {
            removed,
            remaining: state.store.count(),
        };
        tracing::info!(removed, remaining = outcome.remaining, "History cleared");
        outcome
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write the current state to the repository. Returns the number of
    /// history entries written.
    pub async fn flush(&self) -> Result<usize, CoreError> {
        let _flushing = self.flush_lock.lock().await;
        let (persisted, generation) = self.copy_state().await;
        self.write(persisted, generation).await
    }

    /// Like [`flush`](Self::flush) but skips the write when nothing changed
    /// since the last successful flush. Returns `None` when skipped.
    pub async fn flush_if_dirty(&self) -> Result<Option<usize>, CoreError> {
        let _flushing = self.flush_lock.lock().await;
        {
            let state = self.state.read().await;
            if state.generation == state.flushed_generation {
                return Ok(None);
            }
        }
        let (persisted, generation) = self.copy_state().await;
        self.write(persisted, generation).await.map(Some)
    }

    /// Flush and log the outcome instead of returning it.
    pub async fn persist_best_effort(&self) {
        match self.flush().await {
            Ok(entries) => {
                tracing::debug!(entries, backend = self.backend(), "Telemetry flushed");
            }
            Err(e) => {
                tracing::error!(error = %e, backend = self.backend(), "Telemetry flush failed");
            }
        }
    }

    async fn copy_state(&self) -> (PersistedState, u64) {
        let state = self.state.read().await;
        let persisted = PersistedState {
            history: state.store.entries().cloned().collect(),
            thresholds: Some(state.thresholds),
        };
        (persisted, state.generation)
    }

    async fn write(&self, persisted: PersistedState, generation: u64) -> Result<usize, CoreError> {
        self.repository.save(&persisted).await?;
        let mut state = self.state.write().await;
        state.flushed_generation = generation;
        state.last_flush = Some(Utc::now());
        Ok(persisted.history.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::alert::{AlertKind, AlertLocation};
    use crate::persistence::MemoryRepository;

    fn service_with(repo: &Arc<MemoryRepository>, flush_every: u64) -> TelemetryService {
        let options = ServiceOptions {
            flush_every,
            ..Default::default()
        };
        TelemetryService::new(repo.clone(), options)
    }

    #[tokio::test]
    async fn ingest_classifies_and_updates_snapshot() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service_with(&repo, 0);

        let summary = service
            .ingest(&json!({ "front_distance": 10, "ir_distance": 30 }))
            .await
            .unwrap();

        assert_eq!(summary.alerts, 1);
        let current = service.current().await;
        let snapshot = current.snapshot.expect("snapshot after ingest");
        assert!(snapshot.has_alerts);
        assert_eq!(snapshot.alerts[0].kind, AlertKind::Danger);
        assert_eq!(snapshot.alerts[0].location, AlertLocation::Front);
        assert_eq!(snapshot.reading.timestamp, summary.timestamp);
        assert_eq!(current.history_count, 1);
    }

    #[tokio::test]
    async fn missing_front_distance_never_raises_front_alert() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service_with(&repo, 0);

        service.ingest(&json!({ "ir_distance": 30 })).await.unwrap();

        let snapshot = service.current().await.snapshot.unwrap();
        assert_eq!(snapshot.reading.front_distance, 0.0);
        assert!(!snapshot.has_alerts);
    }

    #[tokio::test]
    async fn invalid_payload_is_not_applied() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service_with(&repo, 0);

        let err = service
            .ingest(&json!({ "front_distance": "nope" }))
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::InvalidPayload(_));
        assert_eq!(service.count().await, 0);
        assert!(service.current().await.snapshot.is_none());
    }

    #[tokio::test]
    async fn ingest_timestamps_are_whole_microseconds() {
        use chrono::Timelike;

        let repo = Arc::new(MemoryRepository::new());
        let service = service_with(&repo, 0);

        for _ in 0..5 {
            let summary = service.ingest(&json!({ "ir_distance": 30 })).await.unwrap();
            assert_eq!(summary.timestamp.nanosecond() % 1_000, 0);
        }
        let history = service.history(1.0).await.unwrap();
        assert!(history
            .iter()
            .all(|entry| entry.timestamp.nanosecond() % 1_000 == 0));
    }

    #[tokio::test]
    async fn every_tenth_ingest_flushes() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service_with(&repo, DEFAULT_FLUSH_EVERY);

        for _ in 0..9 {
            service.ingest(&json!({ "ir_distance": 30 })).await.unwrap();
        }
        assert_eq!(repo.save_count().await, 0);

        service.ingest(&json!({ "ir_distance": 30 })).await.unwrap();
        assert_eq!(repo.save_count().await, 1);
        assert_eq!(repo.stored().await.history.len(), 10);

        for _ in 0..10 {
            service.ingest(&json!({ "ir_distance": 30 })).await.unwrap();
        }
        assert_eq!(repo.save_count().await, 2);
    }

    #[tokio::test]
    async fn failing_flush_does_not_fail_ingest() {
        let repo = Arc::new(MemoryRepository::new());
        repo.set_fail_saves(true).await;
        let service = service_with(&repo, 1);

        let summary = service.ingest(&json!({ "front_distance": 30 })).await;

        assert!(summary.is_ok());
        assert_eq!(service.count().await, 1);
        assert!(service.system_info().await.last_flush.is_none());
        assert_matches!(service.flush().await, Err(CoreError::Persistence(_)));
    }

    #[tokio::test]
    async fn flush_if_dirty_skips_unchanged_state() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service_with(&repo, 0);

        assert_eq!(service.flush_if_dirty().await.unwrap(), None);

        service.ingest(&json!({ "ir_distance": 30 })).await.unwrap();
        assert_eq!(service.flush_if_dirty().await.unwrap(), Some(1));
        assert_eq!(service.flush_if_dirty().await.unwrap(), None);
        assert_eq!(repo.save_count().await, 1);
    }

    #[tokio::test]
    async fn threshold_update_applies_to_next_classification() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service_with(&repo, 0);

        // 27cm is a warning under the default 25cm danger band.
        let update = ThresholdUpdate {
            danger_distance: Some(30.0),
            ..Default::default()
        };
        let merged = service.update_thresholds(&update).await.unwrap();
        assert_eq!(merged.danger_distance, 30.0);
        assert_eq!(merged.warn_distance, ThresholdConfig::default().warn_distance);

        service.ingest(&json!({ "front_distance": 27, "ir_distance": 30 })).await.unwrap();
        let snapshot = service.current().await.snapshot.unwrap();
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.alerts[0].kind, AlertKind::Danger);
    }

    #[tokio::test]
    async fn rejected_threshold_update_leaves_config_unchanged() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service_with(&repo, 0);

        let update = ThresholdUpdate {
            warn_distance: Some(10.0),
            ..Default::default()
        };
        assert_matches!(
            service.update_thresholds(&update).await,
            Err(CoreError::ConfigUpdate(_))
        );
        assert_eq!(service.thresholds().await, ThresholdConfig::default());
    }

    #[tokio::test]
    async fn load_rehydrates_history_and_settings() {
        let now = Utc::now();
        let history: Vec<HistoryEntry> = (0..1200)
            .map(|i| HistoryEntry {
                timestamp: now - chrono::Duration::seconds(1200 - i),
                front_distance: i as f64,
                left_distance: 0.0,
                right_distance: 0.0,
                ir_distance: 30.0,
                mode: 1,
                alerts: Vec::new(),
            })
            .collect();
        let thresholds = ThresholdConfig {
            danger_distance: 20.0,
            ..Default::default()
        };
        let repo = Arc::new(MemoryRepository::with_state(PersistedState {
            history,
            thresholds: Some(thresholds),
        }));

        let service = TelemetryService::load(repo.clone(), ServiceOptions::default()).await;

        assert_eq!(service.count().await, DEFAULT_CAPACITY);
        assert_eq!(service.thresholds().await, thresholds);
        let info = service.system_info().await;
        assert_eq!(info.ingested_since_start, 0);
        assert!(info.last_update.is_some());
        assert!(service.current().await.snapshot.is_none());
    }

    #[tokio::test]
    async fn invalid_stored_thresholds_fall_back_to_defaults() {
        let repo = Arc::new(MemoryRepository::with_state(PersistedState {
            history: Vec::new(),
            thresholds: Some(ThresholdConfig {
                danger_distance: 90.0,
                ..Default::default()
            }),
        }));

        let service = TelemetryService::load(repo, ServiceOptions::default()).await;

        assert_eq!(service.thresholds().await, ThresholdConfig::default());
    }

    #[tokio::test]
    async fn set_mode_touches_snapshot_only() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service_with(&repo, 0);
        assert_matches!(service.set_mode(2).await, Err(CoreError::Conflict(_)));

        service.ingest(&json!({ "mode": 1, "ir_distance": 30 })).await.unwrap();
        let snapshot = service.set_mode(3).await.unwrap();

        assert_eq!(snapshot.reading.mode, 3);
        assert_eq!(service.history(1.0).await.unwrap()[0].mode, 1);
        assert_matches!(service.set_mode(0).await, Err(CoreError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn clear_after_many_ingests_keeps_newest() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service_with(&repo, 0);
        for i in 0..500 {
            service
                .ingest(&json!({ "front_distance": i % 400, "ir_distance": 30 }))
                .await
                .unwrap();
        }

        let outcome = service.clear(100).await;

        assert_eq!(outcome, ClearOutcome { removed: 400, remaining: 100 });
        let history = service.history(24.0).await.unwrap();
        assert_eq!(history.len(), 100);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(history[0].front_distance, 0.0); // ingest #400
        assert_eq!(history[99].front_distance, 99.0); // ingest #499
    }

    #[tokio::test]
    async fn query_rejects_non_positive_hours() {
        let repo = Arc::new(MemoryRepository::new());
        let service = service_with(&repo, 0);
        assert_matches!(
            service.history(0.0).await,
            Err(CoreError::InvalidQueryParameter(_))
        );
        assert_matches!(
            service.recent_alerts(-2.0).await,
            Err(CoreError::InvalidQueryParameter(_))
        );
    }

    #[tokio::test]
    async fn concurrent_ingests_keep_snapshot_consistent() {
        let repo = Arc::new(MemoryRepository::new());
        let service = Arc::new(service_with(&repo, 7));

        let mut handles = Vec::new();
        for i in 0..64 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .ingest(&json!({ "front_distance": i, "ir_distance": 30 }))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(service.count().await, 64);
        let history = service.history(1.0).await.unwrap();
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        let snapshot = service.current().await.snapshot.unwrap();
        let last = history.last().unwrap();
        assert_eq!(snapshot.reading.timestamp, last.timestamp);
        assert_eq!(snapshot.reading.front_distance, last.front_distance);
        assert_eq!(repo.save_count().await, 64 / 7);
    }
}
