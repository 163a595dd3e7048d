//! PostgreSQL storage backend for the `history_entries` and
//! `threshold_settings` tables.

use async_trait::async_trait;
use cane_core::alert::Alert;
use cane_core::history::HistoryEntry;
use cane_core::persistence::{PersistedState, PersistenceError, TelemetryRepository};
use cane_core::store::DEFAULT_CAPACITY;
use cane_core::thresholds::ThresholdConfig;
use cane_core::types::Timestamp;
use sqlx::types::Json;

use crate::DbPool;

/// Column list for `history_entries` SELECT and INSERT statements (excludes `id`).
const HISTORY_COLUMNS: &str = "\
    recorded_at, front_distance, left_distance, right_distance, \
    ir_distance, mode, alerts";

/// Bind parameters per history row.
const HISTORY_PARAMS: usize = 7;

const THRESHOLD_COLUMNS: &str = "\
    danger_distance, warn_distance, safe_distance, ir_ground, ir_hole";

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    recorded_at: Timestamp,
    front_distance: f64,
    left_distance: f64,
    right_distance: f64,
    ir_distance: f64,
    mode: i16,
    alerts: Json<Vec<Alert>>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = PersistenceError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let mode = u8::try_from(row.mode)
            .map_err(|_| PersistenceError::Corrupt(format!("mode out of range: {}", row.mode)))?;
        Ok(HistoryEntry {
            timestamp: row.recorded_at,
            front_distance: row.front_distance,
            left_distance: row.left_distance,
            right_distance: row.right_distance,
            ir_distance: row.ir_distance,
            mode,
            alerts: row.alerts.0,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ThresholdRow {
    danger_distance: f64,
    warn_distance: f64,
    safe_distance: f64,
    ir_ground: f64,
    ir_hole: f64,
}

impl From<ThresholdRow> for ThresholdConfig {
    fn from(row: ThresholdRow) -> Self {
        ThresholdConfig {
            danger_distance: row.danger_distance,
            warn_distance: row.warn_distance,
            safe_distance: row.safe_distance,
            ir_ground: row.ir_ground,
            ir_hole: row.ir_hole,
        }
    }
}

/// Stores telemetry in PostgreSQL.
///
/// `save` replaces the table contents inside one transaction, so readers
/// never see a half-written history.
#[derive(Debug, Clone)]
pub struct PgTelemetryRepository {
    pool: DbPool,
}

impl PgTelemetryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn db_error(err: sqlx::Error) -> PersistenceError {
    PersistenceError::Database(err.to_string())
}

#[async_trait]
impl TelemetryRepository for PgTelemetryRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn load(&self) -> Result<PersistedState, PersistenceError> {
        // Newest `DEFAULT_CAPACITY` rows, returned oldest first.
        let query = format!(
            "SELECT {HISTORY_COLUMNS} FROM ( \
                 SELECT id, {HISTORY_COLUMNS} FROM history_entries \
                 ORDER BY id DESC LIMIT $1 \
             ) recent ORDER BY id ASC"
        );
        let rows = sqlx::query_as::<_, HistoryRow>(&query)
            .bind(DEFAULT_CAPACITY as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let history = rows
            .into_iter()
            .map(HistoryEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let query = format!("SELECT {THRESHOLD_COLUMNS} FROM threshold_settings WHERE id = 1");
        let thresholds = sqlx::query_as::<_, ThresholdRow>(&query)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(ThresholdConfig::from);

        Ok(PersistedState {
            history,
            thresholds,
        })
    }

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let excess = state.history.len().saturating_sub(DEFAULT_CAPACITY);
        let history = &state.history[excess..];

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query("DELETE FROM history_entries")
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        if !history.is_empty() {
            // Build a multi-row VALUES clause.
            let mut query = format!("INSERT INTO history_entries ({HISTORY_COLUMNS}) VALUES ");
            let mut param_idx = 1usize;
            for i in 0..history.len() {
                if i > 0 {
                    query.push_str(", ");
                }
                query.push('(');
                for j in 0..HISTORY_PARAMS {
                    if j > 0 {
                        query.push_str(", ");
                    }
                    query.push('$');
                    query.push_str(&param_idx.to_string());
                    param_idx += 1;
                }
                query.push(')');
            }

            let mut q = sqlx::query(&query);
            for entry in history {
                q = q
                    .bind(entry.timestamp)
                    .bind(entry.front_distance)
                    .bind(entry.left_distance)
                    .bind(entry.right_distance)
                    .bind(entry.ir_distance)
                    .bind(i16::from(entry.mode))
                    .bind(Json(&entry.alerts));
            }
            q.execute(&mut *tx).await.map_err(db_error)?;
        }

        if let Some(t) = &state.thresholds {
            let query = format!(
                "INSERT INTO threshold_settings (id, {THRESHOLD_COLUMNS}) \
                 VALUES (1, $1, $2, $3, $4, $5) \
                 ON CONFLICT (id) DO UPDATE SET \
                     danger_distance = EXCLUDED.danger_distance, \
                     warn_distance = EXCLUDED.warn_distance, \
                     safe_distance = EXCLUDED.safe_distance, \
                     ir_ground = EXCLUDED.ir_ground, \
                     ir_hole = EXCLUDED.ir_hole, \
                     updated_at = now()"
            );
            sqlx::query(&query)
                .bind(t.danger_distance)
                .bind(t.warn_distance)
                .bind(t.safe_distance)
                .bind(t.ir_ground)
                .bind(t.ir_hole)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(entries = history.len(), "Saved telemetry to database");
        Ok(())
    }
}
