//! Crawler module for harvesting the remote entity graph
//!
//! This module contains the stages of a harvest, including:
//! - HTTP fetching with rate limiting and retry logic
//! - Discovery of entities through the paginated listing endpoint
//! - The fetch worker pool with link extraction and re-enqueueing
//! - The persistence writer pool
//! - Overall lifecycle coordination

mod context;
mod coordinator;
mod discovery;
mod fetcher;
mod worker;
mod writer;

pub use context::HarvestContext;
pub use coordinator::{run_harvest, Coordinator};
pub use discovery::{DiscoveryProducer, DiscoveryReport};
pub use fetcher::{
    build_http_client, fetch_json, fetch_with_retry, FetchError, FetchOutcome, FetchedDocument,
    RetryPolicy,
};
pub use worker::FetchWorker;
pub use writer::PersistenceWriter;
