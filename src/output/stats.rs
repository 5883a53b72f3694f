//! Run statistics and final reporting
//!
//! Counters are updated concurrently by every stage of a harvest and read
//! once at the end to build the run summary.

use crate::crawler::DiscoveryReport;
use crate::state::ItemState;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by discovery, fetch workers and writers
#[derive(Debug, Default)]
pub struct HarvestStats {
    enqueued: AtomicU64,
    claimed: AtomicU64,
    duplicates: AtomicU64,
    checkpointed: AtomicU64,
    fetched: AtomicU64,
    followed_only: AtomicU64,
    exhausted: AtomicU64,
    rejected: AtomicU64,
    persisted: AtomicU64,
    write_failures: AtomicU64,
    excluded_links: AtomicU64,
}

/// Point-in-time copy of [`HarvestStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Work items put on the frontier (seeds, listing results, extracted links)
    pub enqueued: u64,
    /// Work items taken off the frontier by a fetch worker
    pub claimed: u64,
    pub duplicates: u64,
    pub checkpointed: u64,
    /// Entities fetched and parsed successfully, follow-only types included
    pub fetched: u64,
    pub followed_only: u64,
    /// Dropped after exhausting transient retries
    pub exhausted: u64,
    /// Dropped on a terminal failure
    pub rejected: u64,
    pub persisted: u64,
    pub write_failures: u64,
    /// References skipped because their type is excluded
    pub excluded_links: u64,
}

impl HarvestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one work item reaching `state`
    pub fn record(&self, state: ItemState) {
        let counter = match state {
            ItemState::Claimed => &self.claimed,
            ItemState::Duplicate => &self.duplicates,
            ItemState::Checkpointed => &self.checkpointed,
            ItemState::Queued => &self.fetched,
            ItemState::FollowedOnly => {
                self.fetched.fetch_add(1, Ordering::Relaxed);
                &self.followed_only
            }
            ItemState::Exhausted => &self.exhausted,
            ItemState::Rejected => &self.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enqueued(&self, count: u64) {
        self.enqueued.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_excluded_link(&self) {
        self.excluded_links.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Work items that reached a terminal state so far
    pub fn completed(&self) -> u64 {
        let s = self.snapshot();
        s.duplicates + s.checkpointed + s.fetched + s.dropped()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            enqueued: load(&self.enqueued),
            claimed: load(&self.claimed),
            duplicates: load(&self.duplicates),
            checkpointed: load(&self.checkpointed),
            fetched: load(&self.fetched),
            followed_only: load(&self.followed_only),
            exhausted: load(&self.exhausted),
            rejected: load(&self.rejected),
            persisted: load(&self.persisted),
            write_failures: load(&self.write_failures),
            excluded_links: load(&self.excluded_links),
        }
    }
}

impl StatsSnapshot {
    /// Work items dropped after a failed fetch
    pub fn dropped(&self) -> u64 {
        self.exhausted + self.rejected
    }

    /// Share of attempted fetches that succeeded, in percent
    pub fn success_rate(&self) -> f64 {
        let attempted = self.fetched + self.dropped();
        if attempted == 0 {
            return 0.0;
        }
        (self.fetched as f64 / attempted as f64) * 100.0
    }
}

/// Final accounting of one harvest run
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counts: StatsSnapshot,
    /// Deepest the frontier got during the run
    pub peak_frontier_depth: usize,
    pub discovery: DiscoveryReport,
    /// True if the run was stopped by the shutdown token before draining
    pub cancelled: bool,
}

impl HarvestSummary {
    /// Wall-clock duration of the run in seconds
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Prints the run summary to stdout
pub fn print_summary(summary: &HarvestSummary) {
    let counts = &summary.counts;

    println!("=== Harvest Summary ===\n");

    println!("Run:");
    println!("  Started:  {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Duration: {}s", summary.duration_seconds());
    if summary.cancelled {
        println!("  Status:   cancelled (queued writes flushed)");
    } else {
        println!("  Status:   completed");
    }
    println!();

    println!("Discovery:");
    println!("  Listing pages: {}", summary.discovery.pages);
    println!("  Accepted:      {}", summary.discovery.accepted);
    println!(
        "  Skipped:       {} checkpointed, {} excluded, {} unparseable",
        summary.discovery.skipped_checkpoint,
        summary.discovery.skipped_excluded,
        summary.discovery.unparseable
    );
    if summary.discovery.truncated {
        println!("  Stopped early: a listing page could not be read");
    }
    println!();

    println!("Frontier:");
    println!("  Enqueued:       {}", counts.enqueued);
    println!("  Claimed:        {}", counts.claimed);
    println!("  Peak depth:     {}", summary.peak_frontier_depth);
    println!("  Excluded links: {}", counts.excluded_links);
    println!();

    println!("Items:");
    println!("  Duplicates:   {}", counts.duplicates);
    println!("  Checkpointed: {}", counts.checkpointed);
    println!(
        "  Fetched:      {} ({} follow-only)",
        counts.fetched, counts.followed_only
    );
    println!(
        "  Dropped:      {} ({} retries exhausted, {} rejected)",
        counts.dropped(),
        counts.exhausted,
        counts.rejected
    );
    println!();

    println!("Persistence:");
    println!("  Written:  {}", counts.persisted);
    println!("  Failures: {}", counts.write_failures);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} fetches succeeded)",
        counts.success_rate(),
        counts.fetched,
        counts.fetched + counts.dropped()
    );
}

/// Prints the per-type document counts of an output directory
pub fn print_inventory(root: &Path, inventory: &BTreeMap<String, usize>) {
    println!("=== Harvest Inventory ===\n");
    println!("Output root: {}", root.display());
    println!();

    if inventory.is_empty() {
        println!("No entities persisted yet.");
        return;
    }

    let total: usize = inventory.values().sum();
    println!("Entities by type:");
    for (entity_type, count) in inventory {
        println!("  {}: {}", entity_type, count);
    }
    println!();
    println!("Total: {}", total);
}
