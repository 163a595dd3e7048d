//! JSON-file storage backend.
//!
//! History lives in one file as a pretty-printed array of entries, settings in
//! another as a flat object. Both are written to a sibling temp file first and
//! renamed into place, so a crash mid-write leaves the previous version intact.
//! A file that cannot be parsed on load is moved aside rather than overwritten.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cane_core::history::HistoryEntry;
use cane_core::persistence::{PersistedState, PersistenceError, TelemetryRepository};
use cane_core::store::DEFAULT_CAPACITY;
use cane_core::thresholds::{ThresholdConfig, ThresholdUpdate};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Default history file name.
pub const DEFAULT_DATA_FILE: &str = "data.json";

/// Default settings file name.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    data_path: PathBuf,
    settings_path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(data_path: impl Into<PathBuf>, settings_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            settings_path: settings_path.into(),
        }
    }

    /// Use the default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(DEFAULT_DATA_FILE), dir.join(DEFAULT_SETTINGS_FILE))
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }
}

#[async_trait]
impl TelemetryRepository for JsonFileRepository {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<PersistedState, PersistenceError> {
        let mut history: Vec<HistoryEntry> = read_or_set_aside(&self.data_path)
            .await?
            .unwrap_or_default();
        history.sort_by_key(|entry| entry.timestamp);

        // Settings files may hold a subset of fields; the rest keep defaults.
        // Validation is left to the service so bad settings never block history.
        let thresholds = read_or_set_aside::<ThresholdUpdate>(&self.settings_path)
            .await?
            .map(|update| ThresholdConfig::default().with_update(&update));

        let mut state = PersistedState {
            history,
            thresholds,
        };
        state.truncate_history(DEFAULT_CAPACITY);

        tracing::debug!(
            entries = state.history.len(),
            path = %self.data_path.display(),
            "Loaded history file"
        );
        Ok(state)
    }

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let excess = state.history.len().saturating_sub(DEFAULT_CAPACITY);
        write_json_atomic(&self.data_path, &state.history[excess..]).await?;

        if let Some(thresholds) = &state.thresholds {
            write_json_atomic(&self.settings_path, thresholds).await?;
        }

        tracing::debug!(
            entries = state.history.len() - excess,
            path = %self.data_path.display(),
            "Wrote history file"
        );
        Ok(())
    }
}

/// Like [`read_json`], but an unparseable file is renamed to `<name>.corrupt`
/// and treated as missing, so the next save cannot overwrite it.
async fn read_or_set_aside<T: DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, PersistenceError> {
    match read_json(path).await {
        Err(PersistenceError::Corrupt(reason)) => {
            let aside = with_suffix(path, ".corrupt");
            tokio::fs::rename(path, &aside).await?;
            tracing::warn!(
                path = %path.display(),
                moved_to = %aside.display(),
                reason = %reason,
                "Stored file is unreadable, moved aside"
            );
            Ok(None)
        }
        other => other,
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Read and parse `path`. A missing or blank file yields `None`.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| PersistenceError::Corrupt(format!("{}: {e}", path.display())))
}

async fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), PersistenceError> {
    let bytes = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = with_suffix(path, ".tmp");

    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
