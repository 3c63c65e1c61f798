//! Re-entrancy guard for cleanup sequences

use std::sync::atomic::{AtomicBool, Ordering};

/// Holds a cleanup flag for as long as it lives.
///
/// Acquisition is a compare-and-swap, so at most one holder exists per flag.
/// The flag is released on drop, which covers normal return, early return,
/// panic unwinding and a dropped (cancelled) future.
pub(crate) struct ReentrancyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ReentrancyGuard<'a> {
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
