//! Frame-fence bookkeeping.
//!
//! Queue submission and the fence signal itself belong to an external
//! collaborator; this module only tracks the submitted/retired frame counters
//! and mints the [`FenceTicket`] proof that gates allocator reuse.

use std::sync::atomic::{AtomicU64, Ordering};

/// Proof that the GPU retired all work submitted up to a fence value.
///
/// Only [`FrameFence::retire`] constructs tickets, so holding one means the
/// corresponding wait actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceTicket {
    value: u64,
}

impl FenceTicket {
    /// The fence value this ticket covers.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }
}

/// Monotone submit/retire counters for one queue's frame fence.
#[derive(Debug, Default)]
pub struct FrameFence {
    submitted: AtomicU64,
    retired: AtomicU64,
}

impl FrameFence {
    /// Create a fence with both counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the fence value for the next submission.
    pub fn next_signal(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Highest fence value handed out to a submission.
    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Highest fence value the GPU is known to have retired.
    #[must_use]
    pub fn retired(&self) -> u64 {
        self.retired.load(Ordering::Acquire)
    }

    /// Whether work submitted under `value` has retired.
    #[must_use]
    pub fn is_retired(&self, value: u64) -> bool {
        self.retired() >= value
    }

    /// Record that the external fence wait observed `value` and mint the
    /// ticket proving it.
    ///
    /// # Panics
    /// Panics if `value` exceeds the highest submitted value; a retirement
    /// cannot outrun submission.
    pub fn retire(&self, value: u64) -> FenceTicket {
        assert!(
            value <= self.submitted(),
            "fence value {value} retired before being submitted"
        );
        self.retired.fetch_max(value, Ordering::AcqRel);
        FenceTicket { value }
    }
}
