//! Process-wide accounting counters.
//!
//! Diagnostic only — nothing in the allocation or deallocation path makes a
//! correctness decision based on these values. `AtomicUsize` is used rather
//! than a plain integer behind a mutex: in the LL variant the global mutex
//! already covers the update, but in NL there is no other synchronization
//! around the counters at all, so a plain integer there would race.

use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) struct Accounting {
    total: AtomicUsize,
    freed: AtomicUsize,
}

impl Accounting {
    pub(crate) const fn new() -> Self {
        Self {
            total: AtomicUsize::new(0),
            freed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn add_total(&self, bytes: usize) {
        self.total.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn add_freed(&self, bytes: usize) {
        self.freed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn sub_freed(&self, bytes: usize) {
        self.freed.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub(crate) fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub(crate) fn freed(&self) -> usize {
        self.freed.load(Ordering::Relaxed)
    }
}
