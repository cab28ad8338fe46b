//! Process-wide session id allocation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic allocator of unique session identifiers.
///
/// Identifiers are strictly increasing, never zero, and never reused for
/// the lifetime of the allocator. Allocation is a single lock-free atomic
/// increment, safe under any number of concurrently negotiating sessions.
/// Wraparound of the 64-bit counter is out of realistic reach: at one
/// session per nanosecond it takes over five centuries.
#[derive(Debug)]
pub struct SessionIdAllocator {
    next: AtomicU64,
}

impl SessionIdAllocator {
    /// Create an allocator whose first id is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next session id.
    pub fn next_session_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SessionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let alloc = SessionIdAllocator::new();
        assert_eq!(alloc.next_session_id(), 1);
        assert_eq!(alloc.next_session_id(), 2);
        assert_eq!(alloc.next_session_id(), 3);
    }

    #[test]
    fn test_concurrent_allocation_yields_distinct_ids() {
        let alloc = Arc::new(SessionIdAllocator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let alloc = Arc::clone(&alloc);
            handles.push(std::thread::spawn(move || {
                (0..1000).map(|_| alloc.next_session_id()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert_ne!(id, 0);
                assert!(seen.insert(id), "id {id} allocated twice");
            }
        }
        assert_eq!(seen.len(), 8000);
    }
}
