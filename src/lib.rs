//! Entity-Harvester: a resumable, rate-limited harvester for linked JSON entities
//!
//! This crate walks a remote graph of JSON entities (each identified by a
//! `(type, id)` pair), fetching every entity it can reach through a paginated
//! listing endpoint and through cross-references embedded in fetched documents,
//! and persists them into a local one-file-per-entity cache that doubles as the
//! checkpoint for later runs.

pub mod config;
pub mod crawler;
pub mod entity;
pub mod frontier;
pub mod limiter;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Entity error: {0}")]
    Entity(#[from] EntityError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid link pattern: {0}")]
    LinkPattern(#[from] regex::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Failed to obtain initial discovery page {url}: {reason}")]
    DiscoverySeed { url: String, reason: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid entity type: {0}")]
    InvalidEntityType(String),
}

/// Errors raised while building or parsing entity identifiers
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("Invalid entity type '{0}'")]
    InvalidType(String),

    #[error("Invalid entity id '{0}'")]
    InvalidId(String),

    #[error("Not an entity URL: {0}")]
    NotAnEntityUrl(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for entity operations
pub type EntityResult<T> = std::result::Result<T, EntityError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, FetchError};
pub use entity::{classify_entity, EntityClass, FetchResult, LinkExtractor, WorkItem};
pub use output::HarvestSummary;
pub use state::{ItemState, VisitedSet};
