//! Shared, read-mostly state handed to every harvest stage

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, RetryPolicy};
use crate::entity::{classify_entity, EntityClass, LinkExtractor, WorkItem};
use crate::limiter::{CompositeLimiter, RateLimiter};
use crate::output::HarvestStats;
use crate::state::VisitedSet;
use crate::storage::FileStore;
use reqwest::Client;
use std::sync::Arc;

/// Everything the stages of one run share
///
/// Created once per run by the coordinator and never mutated afterwards,
/// apart from the internally synchronized visited set and counters.
#[derive(Debug)]
pub struct HarvestContext {
    pub config: Config,
    pub client: Client,
    pub store: FileStore,
    pub links: LinkExtractor,
    pub visited: VisitedSet,
    pub stats: HarvestStats,
    pub retry: RetryPolicy,
    /// Budget for entity detail requests
    pub fetch_limiter: CompositeLimiter,
    /// Budget for listing pages: the global budget plus the listing one
    pub listing_limiter: CompositeLimiter,
}

impl HarvestContext {
    pub fn new(config: Config) -> crate::Result<Self> {
        let client = build_http_client(&config.remote)?;
        let links = LinkExtractor::new(config.remote.base())?;
        let store = FileStore::new(&config.output.root);
        let retry = RetryPolicy::from_config(&config.crawler);

        let mut global = RateLimiter::new("global", config.rate.global_per_second)
            .with_burst(config.rate.burst);
        if let Some(max_in_flight) = config.rate.max_in_flight {
            global = global.with_max_in_flight(max_in_flight as usize);
        }
        let global = Arc::new(global);
        let listing = Arc::new(RateLimiter::new("listing", config.rate.listing_per_second));

        Ok(Self {
            fetch_limiter: CompositeLimiter::new(vec![global.clone()]),
            listing_limiter: CompositeLimiter::new(vec![global, listing]),
            config,
            client,
            store,
            links,
            visited: VisitedSet::new(),
            stats: HarvestStats::new(),
            retry,
        })
    }

    /// Returns true if existing checkpoints are ignored for this run
    pub fn revisit(&self) -> bool {
        self.config.crawler.revisit
    }

    pub fn classify(&self, item: &WorkItem) -> EntityClass {
        classify_entity(item.entity_type(), &self.config.entities)
    }

    /// Detail endpoint for `item`
    pub fn entity_url(&self, item: &WorkItem) -> String {
        self.config.remote.entity_url(item)
    }

    /// Returns true if `item` must not be fetched because a previous write exists
    pub async fn is_checkpointed(&self, item: &WorkItem) -> bool {
        !self.revisit() && self.store.exists(item).await
    }
}
