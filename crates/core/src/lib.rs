//! Smart cane telemetry domain logic.
//!
//! Everything in this crate is transport-agnostic: the API crate feeds raw
//! JSON payloads into [`service::TelemetryService`] and the db crate provides
//! [`persistence::TelemetryRepository`] implementations.

pub mod alert;
pub mod classifier;
pub mod error;
pub mod history;
pub mod logs;
pub mod persistence;
pub mod reading;
pub mod service;
pub mod statistics;
pub mod store;
pub mod thresholds;
pub mod types;
