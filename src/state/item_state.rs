/// Item state definitions for tracking harvest progress
///
/// This module defines every state a work item passes through between being
/// claimed from the frontier and being acknowledged.
use std::fmt;

/// Represents the current state of a work item inside a fetch worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    // ===== Active States =====
    /// Item has been taken from the frontier by a worker
    Claimed,

    // ===== Terminal Skip States =====
    /// Item was already claimed earlier in this run
    Duplicate,

    /// Item already exists on disk from this or a previous run
    Checkpointed,

    // ===== Terminal Success States =====
    /// Item was fetched and handed to the write queue
    Queued,

    /// Item was fetched for its links only and is never persisted
    FollowedOnly,

    // ===== Terminal Error States =====
    /// Transient failures exhausted the retry budget
    Exhausted,

    /// A non-retryable failure (wrong content type, invalid JSON, HTTP 4xx)
    Rejected,
}

impl ItemState {
    /// Returns true if this is a terminal state (the item is ready to be acknowledged)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Claimed)
    }

    /// Returns true if the entity was successfully fetched
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Queued | Self::FollowedOnly)
    }

    /// Returns true if the item was skipped without a network request
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Duplicate | Self::Checkpointed)
    }

    /// Returns true if the item was dropped after a failed fetch
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Rejected)
    }

    /// Short label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claimed => "claimed",
            Self::Duplicate => "duplicate",
            Self::Checkpointed => "checkpointed",
            Self::Queued => "queued",
            Self::FollowedOnly => "followed_only",
            Self::Exhausted => "exhausted",
            Self::Rejected => "rejected",
        }
    }

    /// Returns all possible item states
    pub fn all_states() -> [Self; 7] {
        [
            Self::Claimed,
            Self::Duplicate,
            Self::Checkpointed,
            Self::Queued,
            Self::FollowedOnly,
            Self::Exhausted,
            Self::Rejected,
        ]
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claimed_is_not_terminal() {
        assert!(!ItemState::Claimed.is_terminal());
    }

    #[test]
    fn test_every_terminal_state_has_one_category() {
        for state in ItemState::all_states().iter().filter(|s| s.is_terminal()) {
            let categories = [state.is_success(), state.is_skipped(), state.is_dropped()];
            assert_eq!(
                categories.iter().filter(|c| **c).count(),
                1,
                "state {} must be in exactly one category",
                state
            );
        }
    }

    #[test]
    fn test_labels_are_unique() {
        let mut labels: Vec<_> = ItemState::all_states().iter().map(|s| s.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), ItemState::all_states().len());
    }
}
