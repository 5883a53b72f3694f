//! Bounded work queues between harvest stages
//!
//! - `Frontier`: entities waiting to be fetched
//! - `WriteQueue`: fetched documents waiting to be persisted

mod queue;

pub use queue::TaskQueue;

use crate::entity::{FetchResult, WorkItem};

/// Queue of entities waiting to be fetched
pub type Frontier = TaskQueue<WorkItem>;

/// Queue of fetched documents waiting to be written
pub type WriteQueue = TaskQueue<FetchResult>;
