use serde::Serialize;
use thiserror::Error;

use crate::domain::Channel;

/// Errors that abort a run before anything is written.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Missing required input: {0}")]
    MissingRequiredInput(String),

    #[error("Registry snapshot is missing required column '{column}'")]
    RegistrySchema { column: String },

    #[error("No data collected for consolidation from any source")]
    NoData,

    #[error("Failed to write output '{path}': {source}")]
    OutputWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Supplier {table} table is missing key column '{column}'")]
    SupplierSchema { table: String, column: String },

    #[error("Invalid run date '{0}', expected YYYY-MM-DD")]
    InvalidRunDate(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Problems that degrade a run without aborting it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunWarning {
    #[error("{channel}: key column '{column}' not found, channel skipped")]
    MissingKeyColumn { channel: Channel, column: String },

    #[error("{scope}: filter column '{column}' not found, no filter applied")]
    MissingFilterColumn { scope: String, column: String },

    #[error("{channel}: extract is empty, channel skipped")]
    EmptyExtract { channel: Channel },

    #[error("region mapping is missing column '{column}', regions not mapped")]
    RegionMappingSchema { column: String },

    #[error("region mapping table not provided, regions not mapped")]
    RegionMappingUnavailable,

    #[error("registry snapshot contains key '{key}' {count} times")]
    DuplicateRegistryKey { key: String, count: usize },
}
