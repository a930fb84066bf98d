//! Test-only fake break source, shared by the unit tests in `extender`,
//! `engine`, and `facade`.
//!
//! Backed by a fixed-capacity boxed buffer allocated once at its final size:
//! unlike a growable `Vec`, it never reallocates, so pointers handed out by
//! `grow` stay valid for the fake's whole lifetime — which matters because
//! engine-level tests hold onto block pointers across several `extend` calls.

use std::cell::RefCell;

use crate::error::AllocError;
use crate::extender::BreakSource;

pub(crate) struct FakeBreak {
    memory: Box<[u8]>,
    used: RefCell<usize>,
}

// SAFETY: tests drive one `FakeBreak` from a single thread at a time.
unsafe impl Send for FakeBreak {}

impl FakeBreak {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            memory: vec![0u8; capacity].into_boxed_slice(),
            used: RefCell::new(0),
        }
    }
}

impl BreakSource for FakeBreak {
    fn grow(&self, delta: usize) -> Result<*mut u8, AllocError> {
        let mut used = self.used.borrow_mut();
        if *used + delta > self.memory.len() {
            return Err(AllocError::OutOfMemory);
        }
        let prev = self.memory.as_ptr() as usize + *used;
        *used += delta;
        Ok(prev as *mut u8)
    }

    fn current(&self) -> *mut u8 {
        (self.memory.as_ptr() as usize + *self.used.borrow()) as *mut u8
    }
}
