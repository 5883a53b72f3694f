use crate::limiter::{RateLimiter, RatePermit};
use std::sync::Arc;

/// Acquires several independent limiters as one
///
/// Limiters are acquired in order and every permit obtained so far is held
/// while later ones are awaited. Permits are released in reverse order,
/// including when the acquiring future is dropped half way.
#[derive(Debug, Clone)]
pub struct CompositeLimiter {
    limiters: Vec<Arc<RateLimiter>>,
}

/// Permits held from every limiter of a [`CompositeLimiter`]
#[derive(Debug)]
pub struct CompositePermit {
    held: Vec<RatePermit>,
}

impl CompositeLimiter {
    pub fn new(limiters: Vec<Arc<RateLimiter>>) -> Self {
        Self { limiters }
    }

    /// Waits until every limiter has admitted the request
    pub async fn acquire(&self) -> CompositePermit {
        // Built up in place so a cancelled acquire still releases through Drop
        let mut permit = CompositePermit {
            held: Vec::with_capacity(self.limiters.len()),
        };
        for limiter in &self.limiters {
            permit.held.push(limiter.acquire().await);
        }
        permit
    }

    /// Limiter names in acquisition order
    pub fn names(&self) -> Vec<&str> {
        self.limiters.iter().map(|l| l.name()).collect()
    }
}

impl CompositePermit {
    /// Limiter names of the held permits, in acquisition order
    pub fn limiters(&self) -> Vec<&str> {
        self.held.iter().map(|p| p.limiter()).collect()
    }
}

impl Drop for CompositePermit {
    fn drop(&mut self) {
        while let Some(permit) = self.held.pop() {
            drop(permit);
        }
    }
}
