//! Durable storage collaborator for the telemetry service.
//!
//! The service only ever calls [`TelemetryRepository::load`] at startup and
//! [`TelemetryRepository::save`] on a flush trigger. Implementations live in
//! the db crate (JSON files, PostgreSQL); [`MemoryRepository`] is provided
//! here for tests and for running without durable storage.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::history::HistoryEntry;
use crate::store::DEFAULT_CAPACITY;
use crate::thresholds::ThresholdConfig;

/// Failure of a durable storage operation.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt stored data: {0}")]
    Corrupt(String),
}

/// Everything that survives a restart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    /// Oldest first, at most [`DEFAULT_CAPACITY`] entries once saved.
    pub history: Vec<HistoryEntry>,
    /// `None` when no settings were ever stored; the service uses defaults.
    pub thresholds: Option<ThresholdConfig>,
}

impl PersistedState {
    /// Drop the oldest entries beyond `cap`.
    pub fn truncate_history(&mut self, cap: usize) {
        let excess = self.history.len().saturating_sub(cap);
        self.history.drain(..excess);
    }
}

/// Load/save interface implemented by every storage backend.
///
/// `save` must round-trip every field of [`HistoryEntry`] and
/// [`ThresholdConfig`] losslessly and persist at most [`DEFAULT_CAPACITY`]
/// history entries.
#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;

    async fn load(&self) -> Result<PersistedState, PersistenceError>;

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Keeps the last saved state in process memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    state: PersistedState,
    saves: usize,
    fail_saves: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `state` already stored, as if saved by a previous run.
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                state,
                ..Default::default()
            }),
        }
    }

    /// Make every subsequent `save` fail, for exercising error paths.
    pub async fn set_fail_saves(&self, fail: bool) {
        self.inner.lock().await.fail_saves = fail;
    }

    /// Number of successful saves so far.
    pub async fn save_count(&self) -> usize {
        self.inner.lock().await.saves
    }

    /// The most recently saved state.
    pub async fn stored(&self) -> PersistedState {
        self.inner.lock().await.state.clone()
    }
}

#[async_trait]
impl TelemetryRepository for MemoryRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<PersistedState, PersistenceError> {
        Ok(self.inner.lock().await.state.clone())
    }

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_saves {
            return Err(PersistenceError::Io(std::io::Error::other(
                "memory repository configured to fail",
            )));
        }
        let mut stored = state.clone();
        stored.truncate_history(DEFAULT_CAPACITY);
        inner.state = stored;
        inner.saves += 1;
        Ok(())
    }
}
