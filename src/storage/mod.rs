//! Storage module for persisting harvested entities
//!
//! This module owns every disk operation of a harvest:
//! - One pretty-printed JSON file per entity at `{root}/{type}/{id}.json`
//! - Checkpoint checks, where file presence means a previous successful write
//! - Per-type inventory of what has been persisted so far

mod file_store;

pub use file_store::FileStore;

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
