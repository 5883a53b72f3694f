//! Request admission control
//!
//! This module provides the limiters shared by every stage of a harvest:
//! - `RateLimiter`: a token bucket with an optional in-flight cap
//! - `CompositeLimiter`: several limiters acquired together, e.g. the global
//!   budget plus the stricter listing-endpoint budget

mod composite;
mod rate;

pub use composite::{CompositeLimiter, CompositePermit};
pub use rate::{RateLimiter, RatePermit};
