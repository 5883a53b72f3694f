//! Output module for harvest statistics and reports
//!
//! This module handles:
//! - Recording run counters shared by every harvest stage
//! - Building the final run summary
//! - Printing the summary and the on-disk inventory

pub mod stats;

pub use stats::{print_inventory, print_summary, HarvestStats, HarvestSummary, StatsSnapshot};
