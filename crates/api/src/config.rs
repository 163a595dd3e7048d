use std::path::PathBuf;

use cane_core::service::ServiceOptions;
use cane_core::store::DEFAULT_CAPACITY;

/// Durable storage selection, from `STORAGE_BACKEND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// JSON files on local disk.
    File {
        data_file: PathBuf,
        settings_file: PathBuf,
    },
    /// PostgreSQL at `DATABASE_URL`.
    Postgres { database_url: String },
    /// Process memory only; nothing survives a restart.
    Memory,
}

impl StorageConfig {
    pub fn name(&self) -> &'static str {
        match self {
            StorageConfig::File { .. } => "file",
            StorageConfig::Postgres { .. } => "postgres",
            StorageConfig::Memory => "memory",
        }
    }

    fn from_env() -> Self {
        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "file".into());
        match backend.trim().to_ascii_lowercase().as_str() {
            "file" => StorageConfig::File {
                data_file: std::env::var("DATA_FILE")
                    .unwrap_or_else(|_| "data.json".into())
                    .into(),
                settings_file: std::env::var("SETTINGS_FILE")
                    .unwrap_or_else(|_| "settings.json".into())
                    .into(),
            },
            "postgres" => StorageConfig::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .expect("DATABASE_URL must be set when STORAGE_BACKEND=postgres"),
            },
            "memory" => StorageConfig::Memory,
            other => panic!("STORAGE_BACKEND must be one of file, postgres, memory; got '{other}'"),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on the post-shutdown drain and final flush (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub storage: StorageConfig,
    /// Interval between autosave flushes (default: `300`).
    pub autosave_interval_secs: u64,
    /// Flush after this many ingests; `0` disables (default: `10`).
    pub flush_every_ingests: u64,
    /// Retained history entries (default: `1000`).
    pub history_capacity: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `5000`                  |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `30`                    |
    /// | `STORAGE_BACKEND`        | `file`                  |
    /// | `DATA_FILE`              | `data.json`             |
    /// | `SETTINGS_FILE`          | `settings.json`         |
    /// | `DATABASE_URL`           | required for `postgres` |
    /// | `AUTOSAVE_INTERVAL_SECS` | `300`                   |
    /// | `FLUSH_EVERY_INGESTS`    | `10`                    |
    /// | `HISTORY_CAPACITY`       | `1000` (maximum)        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let autosave_interval_secs: u64 = std::env::var("AUTOSAVE_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("AUTOSAVE_INTERVAL_SECS must be a valid u64");
        assert!(
            autosave_interval_secs > 0,
            "AUTOSAVE_INTERVAL_SECS must be greater than zero"
        );

        let flush_every_ingests: u64 = std::env::var("FLUSH_EVERY_INGESTS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("FLUSH_EVERY_INGESTS must be a valid u64");

        let history_capacity: usize = std::env::var("HISTORY_CAPACITY")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("HISTORY_CAPACITY must be a valid usize");
        check_history_capacity(history_capacity);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            storage: StorageConfig::from_env(),
            autosave_interval_secs,
            flush_every_ingests,
            history_capacity,
        }
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            capacity: self.history_capacity,
            flush_every: self.flush_every_ingests,
        }
    }
}

/// Between one and [`DEFAULT_CAPACITY`], the most entries any storage
/// backend persists.
fn check_history_capacity(capacity: usize) {
    assert!(capacity > 0, "HISTORY_CAPACITY must be greater than zero");
    assert!(
        capacity <= DEFAULT_CAPACITY,
        "HISTORY_CAPACITY must be at most {DEFAULT_CAPACITY}, got {capacity}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_capacity_up_to_the_persisted_limit_is_accepted() {
        check_history_capacity(1);
        check_history_capacity(DEFAULT_CAPACITY);
    }

    #[test]
    #[should_panic(expected = "HISTORY_CAPACITY must be at most 1000")]
    fn history_capacity_above_the_persisted_limit_is_rejected() {
        check_history_capacity(DEFAULT_CAPACITY + 1);
    }

    #[test]
    #[should_panic(expected = "greater than zero")]
    fn zero_history_capacity_is_rejected() {
        check_history_capacity(0);
    }
}
