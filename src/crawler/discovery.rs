//! Discovery producer
//!
//! Walks the paginated listing endpoint and feeds every candidate entity that
//! is not yet checkpointed into the frontier. Before each page's batch is
//! enqueued the producer waits for the frontier to drop below the configured
//! backlog, so an arbitrarily long listing cannot flood memory.

use crate::crawler::context::HarvestContext;
use crate::crawler::fetcher::{fetch_with_retry, FetchOutcome};
use crate::entity::WorkItem;
use crate::frontier::Frontier;
use crate::HarvestError;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One page of the listing endpoint
#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default)]
    pagination: Option<Pagination>,
    results: Vec<ListingEntry>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    #[serde(default)]
    url: Option<String>,
}

/// What discovery saw during one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Listing pages fetched and parsed
    pub pages: u64,
    /// Entities put on the frontier
    pub accepted: u64,
    pub skipped_checkpoint: u64,
    pub skipped_excluded: u64,
    /// Listing entries without a recognizable entity URL
    pub unparseable: u64,
    /// True if a page after the first failed and the remaining pages were skipped
    pub truncated: bool,
}

/// Single producer walking the listing endpoint
pub struct DiscoveryProducer {
    ctx: Arc<HarvestContext>,
    frontier: Arc<Frontier>,
    cancel: CancellationToken,
}

impl DiscoveryProducer {
    pub fn new(
        ctx: Arc<HarvestContext>,
        frontier: Arc<Frontier>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            frontier,
            cancel,
        }
    }

    /// Walks the listing until the last page, a failed page, or cancellation
    ///
    /// # Returns
    ///
    /// * `Ok(DiscoveryReport)` - Discovery finished or was stopped
    /// * `Err(HarvestError::DiscoverySeed)` - The first listing page could not be obtained
    pub async fn run(self) -> Result<DiscoveryReport, HarvestError> {
        let mut report = DiscoveryReport::default();

        let Some(start) = self.ctx.config.remote.listing_url()? else {
            tracing::info!("Listing discovery disabled, harvesting from seeds only");
            return Ok(report);
        };

        tracing::info!("Discovery started at {}", start);

        let mut seen_pages = HashSet::new();
        let mut next = Some(start);

        while let Some(page_url) = next.take() {
            if !seen_pages.insert(page_url.clone()) {
                tracing::warn!("Listing pagination loops back to {}, stopping discovery", page_url);
                break;
            }

            let page = match self.fetch_page(&page_url).await {
                None => return Ok(self.stopped(report)),
                Some(Ok(page)) => page,
                Some(Err(reason)) if report.pages == 0 => {
                    return Err(HarvestError::DiscoverySeed {
                        url: page_url.to_string(),
                        reason,
                    });
                }
                Some(Err(reason)) => {
                    tracing::error!(
                        "Listing page {} failed, stopping discovery: {}",
                        page_url,
                        reason
                    );
                    report.truncated = true;
                    break;
                }
            };
            report.pages += 1;

            let batch = self.accept(&page.results, &mut report).await;
            tracing::debug!(
                "Listing page {} yielded {} of {} entries",
                report.pages,
                batch.len(),
                page.results.len()
            );

            if !batch.is_empty() && !self.enqueue(batch, &mut report).await {
                return Ok(self.stopped(report));
            }

            next = match page.pagination.and_then(|p| p.next) {
                Some(cursor) if !cursor.trim().is_empty() => match page_url.join(cursor.trim()) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::error!("Invalid next-page cursor '{}': {}", cursor, e);
                        report.truncated = true;
                        None
                    }
                },
                _ => None,
            };
        }

        tracing::info!(
            "Discovery finished: {} pages, {} entities accepted",
            report.pages,
            report.accepted
        );
        Ok(report)
    }

    /// Fetches and parses one listing page; `None` if cancelled
    async fn fetch_page(&self, url: &Url) -> Option<Result<ListingPage, String>> {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            outcome = fetch_with_retry(
                &self.ctx.client,
                &self.ctx.listing_limiter,
                &self.ctx.retry,
                url.as_str(),
            ) => outcome,
        };

        Some(match outcome {
            FetchOutcome::Fetched { document, .. } => serde_json::from_value(document.payload)
                .map_err(|e| format!("malformed listing page: {}", e)),
            FetchOutcome::Exhausted {
                attempts,
                last_error,
            } => Err(format!("gave up after {} attempts: {}", attempts, last_error)),
            FetchOutcome::Rejected { error, .. } => Err(error.to_string()),
        })
    }

    /// Filters one page of listing entries down to the items worth fetching
    async fn accept(
        &self,
        entries: &[ListingEntry],
        report: &mut DiscoveryReport,
    ) -> Vec<WorkItem> {
        let mut batch = Vec::with_capacity(entries.len());

        for entry in entries {
            let item = match entry.url.as_deref().map(|url| self.ctx.links.parse(url)) {
                Some(Ok(item)) => item,
                Some(Err(e)) => {
                    tracing::debug!("Skipping listing entry: {}", e);
                    report.unparseable += 1;
                    continue;
                }
                None => {
                    tracing::debug!("Skipping listing entry without url");
                    report.unparseable += 1;
                    continue;
                }
            };

            if !self.ctx.classify(&item).should_follow() {
                tracing::debug!("Skipping {}: excluded type", item);
                report.skipped_excluded += 1;
                continue;
            }

            if self.ctx.is_checkpointed(&item).await {
                tracing::debug!("Skipping {}: already checkpointed", item);
                report.skipped_checkpoint += 1;
                continue;
            }

            batch.push(item);
        }

        batch
    }

    /// Waits for the backlog to clear, then enqueues `batch`; false if cancelled
    async fn enqueue(&self, batch: Vec<WorkItem>, report: &mut DiscoveryReport) -> bool {
        let max_backlog = self.ctx.config.crawler.max_backlog;

        if self.frontier.len() >= max_backlog {
            tracing::debug!(
                "Frontier at {} items, discovery waiting for it to drop below {}",
                self.frontier.len(),
                max_backlog
            );
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            _ = self.frontier.wait_below(max_backlog) => {}
        }

        for item in batch {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                _ = self.frontier.put(item) => {}
            }
            self.ctx.stats.record_enqueued(1);
            report.accepted += 1;
        }

        true
    }

    fn stopped(&self, report: DiscoveryReport) -> DiscoveryReport {
        tracing::info!(
            "Discovery cancelled after {} pages, {} entities accepted",
            report.pages,
            report.accepted
        );
        report
    }
}
