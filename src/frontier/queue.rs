use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

struct QueueState<T> {
    items: VecDeque<T>,
    /// Items put (or claimed) but not yet acknowledged
    outstanding: usize,
    peak_depth: usize,
}

/// Bounded async work queue with completion tracking
///
/// Every `put` raises the outstanding count and every `ack` lowers it;
/// `join` resolves once it reaches zero. Because consumers may put follow-up
/// work before acknowledging their own item, a join can only resolve after
/// the whole expansion has been processed.
pub struct TaskQueue<T> {
    name: &'static str,
    capacity: usize,
    state: Mutex<QueueState<T>>,
    pushed: Notify,
    popped: Notify,
    settled: Notify,
}

impl<T> TaskQueue<T> {
    /// Creates an empty queue holding at most `capacity` items
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity: capacity.max(1),
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                outstanding: 0,
                peak_depth: 0,
            }),
            pushed: Notify::new(),
            popped: Notify::new(),
            settled: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently queued
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of items put but not yet acknowledged
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    /// Largest depth observed since creation
    pub fn peak_depth(&self) -> usize {
        self.lock().peak_depth
    }

    /// Enqueues `item`, waiting while the queue is at capacity
    pub async fn put(&self, item: T) {
        let mut pending = item;
        loop {
            let notified = self.popped.notified();
            match self.try_put(pending) {
                Ok(()) => return,
                Err(item) => pending = item,
            }
            notified.await;
        }
    }

    /// Enqueues `item` if there is room, handing it back otherwise
    pub fn try_put(&self, item: T) -> Result<(), T> {
        let mut state = self.lock();
        if state.items.len() >= self.capacity {
            return Err(item);
        }
        state.items.push_back(item);
        state.outstanding += 1;
        state.peak_depth = state.peak_depth.max(state.items.len());
        drop(state);
        self.pushed.notify_waiters();
        Ok(())
    }

    /// Enqueues `item`, or claims it for the caller when the queue is full
    ///
    /// In both cases the item counts as outstanding. A returned item was not
    /// queued: the caller owns it and must process and `ack` it like any
    /// item obtained from `get`. Consumers that also produce use this instead
    /// of `put` so a full queue cannot leave them all waiting on each other.
    pub fn push_or_claim(&self, item: T) -> Option<T> {
        let mut state = self.lock();
        state.outstanding += 1;
        if state.items.len() >= self.capacity {
            return Some(item);
        }
        state.items.push_back(item);
        state.peak_depth = state.peak_depth.max(state.items.len());
        drop(state);
        self.pushed.notify_waiters();
        None
    }

    /// Dequeues the next item, waiting until one is available
    ///
    /// Cancel safe: an item is only removed in the poll that returns it.
    pub async fn get(&self) -> T {
        loop {
            let notified = self.pushed.notified();
            if let Some(item) = self.try_get() {
                return item;
            }
            notified.await;
        }
    }

    /// Dequeues the next item if one is queued
    pub fn try_get(&self) -> Option<T> {
        let item = self.lock().items.pop_front();
        if item.is_some() {
            self.popped.notify_waiters();
        }
        item
    }

    /// Marks one unit of outstanding work as complete
    pub fn ack(&self) {
        let mut state = self.lock();
        match state.outstanding.checked_sub(1) {
            Some(remaining) => {
                state.outstanding = remaining;
                drop(state);
                if remaining == 0 {
                    self.settled.notify_waiters();
                }
            }
            None => {
                drop(state);
                tracing::error!("Queue '{}' acknowledged more items than were put", self.name);
            }
        }
    }

    /// Waits until every item put so far has been acknowledged
    pub async fn join(&self) {
        loop {
            let notified = self.settled.notified();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Waits until the queued depth is strictly below `threshold`
    ///
    /// A threshold of zero is treated as one.
    pub async fn wait_below(&self, threshold: usize) {
        let threshold = threshold.max(1);
        loop {
            let notified = self.popped.notified();
            if self.len() < threshold {
                return;
            }
            notified.await;
        }
    }
}
