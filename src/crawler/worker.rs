//! Fetch worker pool
//!
//! Each worker repeatedly claims one item from the frontier, skips it if it
//! was already claimed this run or is checkpointed on disk, fetches it with
//! retries, puts newly referenced entities back on the frontier and hands
//! the document to the write queue. Every claimed item is acknowledged
//! exactly once, whatever happens to it.

use crate::crawler::context::HarvestContext;
use crate::crawler::fetcher::{fetch_with_retry, FetchOutcome};
use crate::entity::{FetchResult, WorkItem};
use crate::frontier::{Frontier, WriteQueue};
use crate::state::ItemState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How often (in completed items) a progress line is logged
const PROGRESS_INTERVAL: u64 = 100;

/// One member of the fetch worker pool
pub struct FetchWorker {
    id: usize,
    ctx: Arc<HarvestContext>,
    frontier: Arc<Frontier>,
    write_queue: Arc<WriteQueue>,
    cancel: CancellationToken,
    /// Items claimed from a full frontier, processed before taking new ones
    overflow: Vec<WorkItem>,
}

impl FetchWorker {
    pub fn new(
        id: usize,
        ctx: Arc<HarvestContext>,
        frontier: Arc<Frontier>,
        write_queue: Arc<WriteQueue>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            ctx,
            frontier,
            write_queue,
            cancel,
            overflow: Vec::new(),
        }
    }

    /// Processes frontier items until cancelled
    pub async fn run(mut self) {
        tracing::info!("Fetch worker {} started", self.id);

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let item = match self.overflow.pop() {
                Some(item) => item,
                None => tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    item = self.frontier.get() => item,
                },
            };

            let state = self.process(&item).await;
            self.frontier.ack();

            let Some(state) = state else {
                tracing::debug!("Fetch worker {} abandoned {} on shutdown", self.id, item);
                break;
            };
            self.ctx.stats.record(state);
            tracing::trace!("{} -> {}", item, state);

            let completed = self.ctx.stats.completed();
            if completed % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Progress: {} items done, {} queued, {} outstanding",
                    completed,
                    self.frontier.len(),
                    self.frontier.outstanding()
                );
            }
        }

        if !self.overflow.is_empty() {
            tracing::debug!(
                "Fetch worker {} left {} overflow items for the next run",
                self.id,
                self.overflow.len()
            );
        }
        tracing::info!("Fetch worker {} stopped", self.id);
    }

    /// Carries one claimed item to a terminal state
    ///
    /// Returns `None` if cancellation interrupted the fetch.
    async fn process(&mut self, item: &WorkItem) -> Option<ItemState> {
        self.ctx.stats.record(ItemState::Claimed);

        if !self.ctx.visited.insert(item) {
            tracing::debug!("Skipping {}: already claimed this run", item);
            return Some(ItemState::Duplicate);
        }

        if self.ctx.is_checkpointed(item).await {
            tracing::debug!("Skipping {}: already checkpointed", item);
            return Some(ItemState::Checkpointed);
        }

        let url = self.ctx.entity_url(item);
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            outcome = fetch_with_retry(
                &self.ctx.client,
                &self.ctx.fetch_limiter,
                &self.ctx.retry,
                &url,
            ) => outcome,
        };

        let state = match outcome {
            FetchOutcome::Fetched { document, attempts } => {
                tracing::debug!("Fetched {} in {} attempt(s)", item, attempts);
                self.follow_links(item, &document.raw);

                if self.ctx.classify(item).should_persist() {
                    // Not raced against cancellation: a fetched document is never dropped
                    self.write_queue
                        .put(FetchResult {
                            item: item.clone(),
                            payload: document.payload,
                            raw_text: document.raw,
                        })
                        .await;
                    ItemState::Queued
                } else {
                    tracing::debug!("Not persisting {}: follow-only type", item);
                    ItemState::FollowedOnly
                }
            }
            FetchOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                tracing::error!(
                    "Dropping {} after {} attempts: {}",
                    item,
                    attempts,
                    last_error
                );
                ItemState::Exhausted
            }
            FetchOutcome::Rejected { error, .. } => {
                tracing::warn!("Dropping {}: {}", item, error);
                ItemState::Rejected
            }
        };

        Some(state)
    }

    /// Puts every new entity referenced by `raw` on the frontier
    fn follow_links(&mut self, source: &WorkItem, raw: &str) {
        for reference in self.ctx.links.extract(raw) {
            if &reference == source {
                continue;
            }

            if !self.ctx.classify(&reference).should_follow() {
                tracing::debug!("Not following {} from {}: excluded type", reference, source);
                self.ctx.stats.record_excluded_link();
                continue;
            }

            if self.ctx.visited.contains(&reference) {
                continue;
            }

            self.ctx.stats.record_enqueued(1);
            if let Some(claimed) = self.frontier.push_or_claim(reference) {
                tracing::debug!(
                    "Frontier full, worker {} keeps {} for itself",
                    self.id,
                    claimed
                );
                self.overflow.push(claimed);
            }
        }
    }
}
