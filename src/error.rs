// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the index store and configuration layers.
//!
//! Typed `thiserror` enums at the public-API boundary; `anyhow` at the
//! operation-result boundary so warnings/errors compose with `?` across
//! module boundaries.

use thiserror::Error;

/// Errors that can occur opening or querying the index store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open index store: {0}")]
    Open(String),

    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("transaction failed: {0}")]
    Transaction(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Query(err.to_string())
    }
}

/// Errors that can occur loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("invalid config format: {0}")]
    InvalidFormat(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error propagation.
pub type Result<T> = anyhow::Result<T>;
