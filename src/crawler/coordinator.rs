//! Harvest coordinator - lifecycle of one harvest run
//!
//! This module wires the stages of a harvest together and owns their
//! lifecycle:
//! - Starting the writer pool, the fetch worker pool and discovery
//! - Seeding the frontier from the configuration
//! - Draining the frontier and the write queue once discovery is done
//! - Stopping fetch workers before writers so no fetched document is lost
//! - Building the final run summary

use crate::config::Config;
use crate::crawler::context::HarvestContext;
use crate::crawler::discovery::{DiscoveryProducer, DiscoveryReport};
use crate::crawler::worker::FetchWorker;
use crate::crawler::writer::PersistenceWriter;
use crate::frontier::{Frontier, WriteQueue};
use crate::output::HarvestSummary;
use crate::HarvestError;
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Fetched documents that may wait for a writer before fetch workers block
const WRITE_QUEUE_CAPACITY: usize = 256;

/// Main harvest coordinator structure
pub struct Coordinator {
    ctx: Arc<HarvestContext>,
    frontier: Arc<Frontier>,
    write_queue: Arc<WriteQueue>,
    shutdown: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated harvest configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - Failed to build the HTTP client or link extractor
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let frontier_capacity = config.crawler.frontier_capacity;
        let ctx = HarvestContext::new(config)?;

        Ok(Self {
            ctx: Arc::new(ctx),
            frontier: Arc::new(Frontier::new("frontier", frontier_capacity)),
            write_queue: Arc::new(WriteQueue::new("write-queue", WRITE_QUEUE_CAPACITY)),
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that stops the run early when cancelled
    ///
    /// Discovery and fetch workers stop at their next suspension point;
    /// documents already fetched are still written before `run` returns.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs the harvest to completion
    ///
    /// 1. Start writers, then fetch workers
    /// 2. Put the configured seeds on the frontier
    /// 3. Run discovery to the end of the listing
    /// 4. Wait for the frontier to drain
    /// 5. Stop fetch workers, wait for the write queue to drain, stop writers
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestSummary)` - The run finished, possibly cancelled or with dropped items
    /// * `Err(HarvestError)` - The first listing page could not be obtained
    pub async fn run(self) -> Result<HarvestSummary, HarvestError> {
        let started_at = Utc::now();
        let crawler = &self.ctx.config.crawler;

        tracing::info!(
            "Starting harvest of {} into {} ({} fetch workers, {} writers{})",
            self.ctx.config.remote.base(),
            self.ctx.store.root().display(),
            crawler.fetch_workers,
            crawler.writer_workers,
            if self.ctx.revisit() { ", revisiting" } else { "" }
        );

        let fetch_cancel = self.shutdown.child_token();
        let write_cancel = CancellationToken::new();

        let writers: Vec<_> = (0..crawler.writer_workers as usize)
            .map(|id| {
                let writer = PersistenceWriter::new(
                    id,
                    self.ctx.clone(),
                    self.write_queue.clone(),
                    write_cancel.clone(),
                );
                tokio::spawn(writer.run())
            })
            .collect();

        let workers: Vec<_> = (0..crawler.fetch_workers as usize)
            .map(|id| {
                let worker = FetchWorker::new(
                    id,
                    self.ctx.clone(),
                    self.frontier.clone(),
                    self.write_queue.clone(),
                    fetch_cancel.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect();

        self.enqueue_seeds().await;

        let discovery = DiscoveryProducer::new(
            self.ctx.clone(),
            self.frontier.clone(),
            self.shutdown.child_token(),
        );
        let discovery = match tokio::spawn(discovery.run()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Discovery task failed: {}", e);
                Ok(DiscoveryReport::default())
            }
        };

        match &discovery {
            Ok(_) => {
                tracing::info!(
                    "Discovery done, waiting for {} outstanding items",
                    self.frontier.outstanding()
                );
                tokio::select! {
                    _ = self.frontier.join() => tracing::info!("Frontier drained"),
                    _ = self.shutdown.cancelled() => tracing::warn!(
                        "Shutdown requested, leaving {} queued items for the next run",
                        self.frontier.len()
                    ),
                }
            }
            Err(e) => tracing::error!("Aborting harvest: {}", e),
        }

        // Fetch workers stop first so nothing new reaches the write queue
        fetch_cancel.cancel();
        join_workers(workers, "Fetch worker").await;

        tracing::info!(
            "Waiting for {} documents to be written",
            self.write_queue.outstanding()
        );
        self.write_queue.join().await;
        write_cancel.cancel();
        join_workers(writers, "Writer").await;

        let summary = HarvestSummary {
            started_at,
            finished_at: Utc::now(),
            counts: self.ctx.stats.snapshot(),
            peak_frontier_depth: self.frontier.peak_depth(),
            discovery: discovery.as_ref().cloned().unwrap_or_default(),
            cancelled: self.shutdown.is_cancelled(),
        };

        tracing::info!(
            "Harvest {}: {} fetched, {} written, {} dropped in {}s",
            if summary.cancelled { "cancelled" } else { "finished" },
            summary.counts.fetched,
            summary.counts.persisted,
            summary.counts.dropped(),
            summary.duration_seconds()
        );

        discovery.map(|_| summary)
    }

    /// Puts every configured seed on the frontier
    async fn enqueue_seeds(&self) {
        let mut seeded = 0;

        for seed in &self.ctx.config.seeds {
            let item = match seed.to_work_item() {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!("Ignoring seed: {}", e);
                    continue;
                }
            };
            if !self.ctx.classify(&item).should_follow() {
                tracing::warn!("Ignoring seed {}: excluded type", item);
                continue;
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return,
                _ = self.frontier.put(item) => {}
            }
            self.ctx.stats.record_enqueued(1);
            seeded += 1;
        }

        if seeded > 0 {
            tracing::info!("Seeded frontier with {} items", seeded);
        }
    }
}

/// Waits for every task, logging instead of propagating failures
async fn join_workers(handles: Vec<JoinHandle<()>>, role: &str) {
    for (id, handle) in handles.into_iter().enumerate() {
        if let Err(e) = handle.await {
            if e.is_cancelled() {
                tracing::debug!("{} {} was cancelled", role, id);
            } else {
                tracing::error!("{} {} failed: {}", role, id, e);
            }
        }
    }
}

/// Runs a complete harvest operation
///
/// # Arguments
///
/// * `config` - The harvest configuration
///
/// # Returns
///
/// * `Ok(HarvestSummary)` - Harvest completed
/// * `Err(HarvestError)` - Harvest could not start or lost its discovery seed
///
/// # Example
///
/// ```no_run
/// use entity_harvester::config::load_config;
/// use entity_harvester::crawler::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = run_harvest(config).await?;
/// println!("{} entities written", summary.counts.persisted);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: Config) -> Result<HarvestSummary, HarvestError> {
    Coordinator::new(config)?.run().await
}
