//! Periodic flush of telemetry state to durable storage.
//!
//! Complements the count-based flush in the ingest path so a slow trickle of
//! readings is still checkpointed. Ticks that find nothing changed since the
//! last successful flush skip the write.

use std::sync::Arc;
use std::time::Duration;

use cane_core::service::TelemetryService;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Run the autosave loop until `cancel` is triggered.
///
/// The first flush happens one full `period` after start.
pub async fn run(service: Arc<TelemetryService>, period: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = period.as_secs(),
        backend = service.backend(),
        "Autosave job started"
    );

    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Autosave job stopping");
                break;
            }
            _ = interval.tick() => {
                match service.flush_if_dirty().await {
                    Ok(Some(entries)) => {
                        tracing::info!(entries, "Autosave: telemetry flushed");
                    }
                    Ok(None) => {
                        tracing::debug!("Autosave: nothing changed since last flush");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Autosave: flush failed");
                    }
                }
            }
        }
    }
}
