use serde::Deserialize;
use url::Url;

use crate::entity::WorkItem;
use crate::{ConfigError, EntityResult};

/// Main configuration structure for a harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub remote: RemoteConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub rate: RateConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub entities: EntitiesConfig,
    #[serde(default, rename = "seed")]
    pub seeds: Vec<SeedEntry>,
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Root of the entity API, e.g. `https://example.org/api`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Listing endpoint relative to the base URL; empty disables listing discovery
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory under which `{type}/{id}.json` files are written
    pub root: String,
}

/// Request rate budgets
#[derive(Debug, Clone, Deserialize)]
pub struct RateConfig {
    /// Requests per second shared by every request the harvester makes
    #[serde(rename = "global-per-second", default = "default_global_rate")]
    pub global_per_second: f64,

    /// Requests per second additionally applied to listing pages
    #[serde(rename = "listing-per-second", default = "default_listing_rate")]
    pub listing_per_second: f64,

    /// Token bucket capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Optional cap on concurrently outstanding requests
    #[serde(rename = "max-in-flight", default)]
    pub max_in_flight: Option<u32>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers
    #[serde(rename = "fetch-workers", default = "default_fetch_workers")]
    pub fetch_workers: u32,

    /// Number of concurrent persistence writers
    #[serde(rename = "writer-workers", default = "default_writer_workers")]
    pub writer_workers: u32,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay of the exponential retry backoff (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Hard bound on queued frontier items
    #[serde(rename = "frontier-capacity", default = "default_frontier_capacity")]
    pub frontier_capacity: usize,

    /// Frontier depth above which discovery pauses
    #[serde(rename = "max-backlog", default = "default_max_backlog")]
    pub max_backlog: usize,

    /// Ignore existing checkpoints for this run
    #[serde(default)]
    pub revisit: bool,
}

/// Entity type handling
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitiesConfig {
    /// Types that are never followed nor fetched
    #[serde(default)]
    pub excluded: Vec<String>,

    /// Types fetched only to discover further links, never persisted
    #[serde(rename = "follow-only", default)]
    pub follow_only: Vec<String>,
}

/// Initial work item declared in the configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: String,
}

impl SeedEntry {
    /// Converts this seed into a validated work item
    pub fn to_work_item(&self) -> EntityResult<WorkItem> {
        WorkItem::new(&self.entity_type, &self.id)
    }
}

impl RemoteConfig {
    /// Base URL without a trailing slash
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Parses the base URL, keeping a trailing slash so relative joins stay below it
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&format!("{}/", self.base()))
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))
    }

    /// Detail endpoint for a single entity: `{base}/{type}/{id}/`
    pub fn entity_url(&self, item: &WorkItem) -> String {
        format!("{}/{}/{}/", self.base(), item.entity_type(), item.entity_id())
    }

    /// Listing endpoint, or `None` when listing discovery is disabled
    pub fn listing_url(&self) -> Result<Option<Url>, ConfigError> {
        let path = self.listing_path.trim().trim_start_matches('/');
        if path.is_empty() {
            return Ok(None);
        }
        self.base_url()?
            .join(path)
            .map(Some)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listing-path: {}", e)))
    }
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            global_per_second: default_global_rate(),
            listing_per_second: default_listing_rate(),
            burst: default_burst(),
            max_in_flight: None,
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            fetch_workers: default_fetch_workers(),
            writer_workers: default_writer_workers(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff(),
            frontier_capacity: default_frontier_capacity(),
            max_backlog: default_max_backlog(),
            revisit: false,
        }
    }
}

fn default_listing_path() -> String {
    "search/?type=all".to_string()
}

fn default_user_agent() -> String {
    format!("entity-harvester/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    30
}

fn default_global_rate() -> f64 {
    5.0
}

fn default_listing_rate() -> f64 {
    1.0
}

fn default_burst() -> u32 {
    1
}

fn default_fetch_workers() -> u32 {
    4
}

fn default_writer_workers() -> u32 {
    2
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    500
}

fn default_frontier_capacity() -> usize {
    10_000
}

fn default_max_backlog() -> usize {
    1_000
}
