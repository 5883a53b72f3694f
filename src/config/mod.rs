//! Configuration module for Entity-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The loaded [`Config`] is created once at startup and shared read-only with
//! every component of a harvest.
//!
//! # Example
//!
//! ```no_run
//! use entity_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting from: {}", config.remote.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, EntitiesConfig, OutputConfig, RateConfig, RemoteConfig, SeedEntry,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
