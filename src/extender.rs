//! The heap extender: the only thing in this crate that talks to the OS.
//!
//! Growing the break and initializing the header of the newly appended block
//! happen under a single dedicated mutex (the "break mutex") so that two
//! threads racing to extend can never produce overlapping regions. This lock
//! is never held while walking a free list.

use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::accounting::Accounting;
use crate::block::{BlockHeader, HEADER_SIZE};
use crate::error::AllocError;

/// Abstraction over the OS break primitive, so tests can substitute a fake
/// that simulates refusal without exhausting real process memory.
pub(crate) trait BreakSource: Send {
    /// Grow the break by `delta` bytes (`delta > 0`) and return the *previous*
    /// break — the start address of the newly appended region. `Err` on refusal.
    fn grow(&self, delta: usize) -> Result<*mut u8, AllocError>;

    /// The current one-past-the-end address of the region, without growing it.
    fn current(&self) -> *mut u8;
}

/// Production break source: POSIX `sbrk(2)`.
pub(crate) struct Sbrk;

impl BreakSource for Sbrk {
    fn grow(&self, delta: usize) -> Result<*mut u8, AllocError> {
        let prev = unsafe { libc::sbrk(delta as libc::intptr_t) };
        if prev as isize == -1 {
            return Err(AllocError::OutOfMemory);
        }
        Ok(prev as *mut u8)
    }

    fn current(&self) -> *mut u8 {
        unsafe { libc::sbrk(0) as *mut u8 }
    }
}

/// Serializes OS heap extension and reports the current break.
pub(crate) struct Extender<B: BreakSource> {
    source: B,
    break_lock: Mutex<()>,
    /// First break address observed, recorded once on first extension.
    /// `0` means "not yet recorded".
    anchor: AtomicUsize,
}

impl<B: BreakSource> Extender<B> {
    pub(crate) const fn new(source: B) -> Self {
        Self {
            source,
            break_lock: Mutex::new(()),
            anchor: AtomicUsize::new(0),
        }
    }

    /// Extend the heap by `HEADER_SIZE + size` bytes and return a freshly
    /// initialized, allocated block header for the appended region.
    pub(crate) fn extend(
        &self,
        size: usize,
        accounting: &Accounting,
    ) -> Result<*mut BlockHeader, AllocError> {
        let total_len = HEADER_SIZE + size;
        let _guard = self.break_lock.lock().expect("break mutex poisoned");

        let prev = self.source.grow(total_len)?;
        self.anchor
            .compare_exchange(0, prev as usize, Ordering::Relaxed, Ordering::Relaxed)
            .ok();

        let block = prev as *mut BlockHeader;
        unsafe {
            (*block).size = size;
            (*block).available = false;
            (*block).next_free = ptr::null_mut();
        }

        accounting.add_total(total_len);
        log::info!(
            "heap extended by {total_len} bytes (payload {size}), new break at {:?}",
            self.source.current()
        );
        Ok(block)
    }

    pub(crate) fn current_break(&self) -> usize {
        self.source.current() as usize
    }

    #[cfg(test)]
    pub(crate) fn anchor(&self) -> usize {
        self.anchor.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBreak;

    #[test]
    fn extend_records_anchor_once() {
        let acc = Accounting::new();
        let ext = Extender::new(FakeBreak::new(1 << 20));
        assert_eq!(ext.anchor(), 0);
        ext.extend(100, &acc).unwrap();
        let first_anchor = ext.anchor();
        assert_ne!(first_anchor, 0);
        ext.extend(50, &acc).unwrap();
        assert_eq!(ext.anchor(), first_anchor);
    }

    #[test]
    fn extend_advances_total_and_not_on_failure() {
        let acc = Accounting::new();
        let ext = Extender::new(FakeBreak::new(HEADER_SIZE + 100));
        ext.extend(100, &acc).unwrap();
        assert_eq!(acc.total(), HEADER_SIZE + 100);

        let before = acc.total();
        assert!(ext.extend(1, &acc).is_err());
        assert_eq!(acc.total(), before);
    }
}
