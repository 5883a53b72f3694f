//! State module for tracking harvest progress
//!
//! This module provides state management for work items during a harvest.
//!
//! # Components
//!
//! - `ItemState`: Tracks the state of individual work items (claimed, queued, dropped, etc.)
//! - `VisitedSet`: Records which work items have been claimed in the current run

mod item_state;
mod visited;

// Re-export main types
pub use item_state::ItemState;
pub use visited::VisitedSet;
