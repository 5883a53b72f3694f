//! Token bucket rate limiter
//!
//! Callers that find the bucket empty reserve a future token by driving the
//! balance negative, then sleep until it would have refilled. Waiters are
//! therefore served in arrival order and never poll.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Upper bound for a single wait, reached only by pathological rates
const MAX_WAIT: Duration = Duration::from_secs(86_400);

/// Admission control for one request budget
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    per_second: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
    in_flight: Option<Arc<Semaphore>>,
}

#[derive(Debug)]
struct Bucket {
    /// Remaining budget; negative values are reservations not yet refilled
    tokens: f64,
    updated: Instant,
}

/// Proof of admission, held for the duration of one request
///
/// Dropping the permit returns its in-flight slot, if the limiter has one.
#[derive(Debug)]
pub struct RatePermit {
    limiter: String,
    slot: Option<OwnedSemaphorePermit>,
}

impl RatePermit {
    /// Name of the limiter that issued this permit
    pub fn limiter(&self) -> &str {
        &self.limiter
    }
}

impl Drop for RatePermit {
    fn drop(&mut self) {
        if self.slot.take().is_some() {
            tracing::trace!(limiter = %self.limiter, "Released in-flight slot");
        }
    }
}

impl RateLimiter {
    /// Creates a limiter admitting `per_second` requests with a burst of one
    pub fn new(name: impl Into<String>, per_second: f64) -> Self {
        Self {
            name: name.into(),
            per_second,
            burst: 1.0,
            bucket: Mutex::new(Bucket {
                tokens: 1.0,
                updated: Instant::now(),
            }),
            in_flight: None,
        }
    }

    /// Sets the bucket capacity; the bucket starts full
    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = f64::from(burst.max(1));
        self.bucket = Mutex::new(Bucket {
            tokens: self.burst,
            updated: Instant::now(),
        });
        self
    }

    /// Additionally caps how many permits may be outstanding at once
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.in_flight = Some(Arc::new(Semaphore::new(max_in_flight.max(1))));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn per_second(&self) -> f64 {
        self.per_second
    }

    /// Free in-flight slots, or `None` when concurrency is not capped
    pub fn available_slots(&self) -> Option<usize> {
        self.in_flight.as_ref().map(|s| s.available_permits())
    }

    /// Waits until the budget admits one more request
    ///
    /// Never fails; the returned permit should be kept alive until the
    /// request it guards has completed.
    pub async fn acquire(&self) -> RatePermit {
        // Slot first: a token is only taken once the request can start
        let slot = match &self.in_flight {
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        };

        let reservation = Reservation {
            limiter: self,
            settled: false,
        };
        let wait = self.reserve();
        if !wait.is_zero() {
            tracing::trace!(
                limiter = %self.name,
                wait_ms = wait.as_millis() as u64,
                "Waiting for rate budget"
            );
            tokio::time::sleep(wait).await;
        }
        reservation.settle();

        RatePermit {
            limiter: self.name.clone(),
            slot,
        }
    }

    /// Takes one token and returns how long until it is actually available
    fn reserve(&self) -> Duration {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let refill = now.duration_since(bucket.updated).as_secs_f64() * self.per_second;

        bucket.tokens = (bucket.tokens + refill).min(self.burst) - 1.0;
        bucket.updated = now;

        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(-bucket.tokens / self.per_second).unwrap_or(MAX_WAIT)
        }
    }

    /// Gives back a token whose waiter went away before using it
    fn refund(&self) {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.tokens = (bucket.tokens + 1.0).min(self.burst);
    }
}

/// A token taken by an `acquire` that has not returned yet
///
/// Dropped unsettled when the acquire future is cancelled mid-wait, in
/// which case the token goes back to the bucket.
struct Reservation<'a> {
    limiter: &'a RateLimiter,
    settled: bool,
}

impl Reservation<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.limiter.refund();
            tracing::trace!(limiter = %self.limiter.name, "Returned unused rate token");
        }
    }
}
