//! Integration tests for the PostgreSQL repository.
//!
//! These need a live database (`DATABASE_URL`) and are ignored by default:
//! `cargo test -p cane-db -- --ignored`.

use std::sync::Arc;

use cane_core::history::HistoryEntry;
use cane_core::persistence::{PersistedState, TelemetryRepository};
use cane_core::service::{ServiceOptions, TelemetryService};
use cane_core::thresholds::ThresholdConfig;
use cane_db::PgTelemetryRepository;
use chrono::{TimeDelta, TimeZone, Utc};
use serde_json::json;
use sqlx::PgPool;

fn entry(seconds_ago: i64, front: f64) -> HistoryEntry {
    let base = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let timestamp = base - TimeDelta::seconds(seconds_ago);
    HistoryEntry {
        timestamp,
        front_distance: front,
        left_distance: 0.0,
        right_distance: 33.0,
        ir_distance: 30.0,
        mode: 1,
        alerts: Vec::new(),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn empty_database_loads_empty(pool: PgPool) {
    cane_db::health_check(&pool).await.unwrap();
    let repo = PgTelemetryRepository::new(pool);

    let state = repo.load().await.unwrap();

    assert!(state.history.is_empty());
    assert_eq!(state.thresholds, None);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn save_replaces_previous_contents(pool: PgPool) {
    let repo = PgTelemetryRepository::new(pool);
    repo.save(&PersistedState {
        history: vec![entry(60, 1.0), entry(50, 2.0)],
        thresholds: Some(ThresholdConfig::default()),
    })
    .await
    .unwrap();

    let second = PersistedState {
        history: vec![entry(10, 3.0)],
        thresholds: Some(ThresholdConfig {
            warn_distance: 60.0,
            ..Default::default()
        }),
    };
    repo.save(&second).await.unwrap();

    assert_eq!(repo.load().await.unwrap(), second);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn ingested_history_reloads_unchanged(pool: PgPool) {
    let repo: Arc<dyn TelemetryRepository> = Arc::new(PgTelemetryRepository::new(pool));
    let service = TelemetryService::new(Arc::clone(&repo), ServiceOptions::default());
    for front in [10, 45, 200] {
        service
            .ingest(&json!({ "front_distance": front, "ir_distance": 30 }))
            .await
            .unwrap();
    }
    service.flush().await.unwrap();

    let loaded = repo.load().await.unwrap();

    assert_eq!(loaded.history, service.history(1.0).await.unwrap());
}
