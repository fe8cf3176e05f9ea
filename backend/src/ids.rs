//! Identifier allocation
//!
//! Each registry owns its own [`IdAllocator`], so two servers in one process
//! (as in the integration tests) hand out independent, deterministic IDs.

use std::sync::atomic::{AtomicU64, Ordering};

pub type SessionId = u64;

/// Monotonic counter shared by the tasks of one registry
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Allocator whose first ID is 1
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        IdAllocator {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
