// =============================================================================
// ts-malloc — Thread-Safe Heap Allocator
// =============================================================================
//
// A userspace general-purpose allocator built directly on the process break
// (`sbrk`). The heap is one contiguous region, grown on demand via
// `extender::Sbrk`, carved into blocks prefixed by a `block::BlockHeader`.
//
// Two allocation strategies share that same region:
//
//   locked (LL)   — one free list shared by every thread, guarded by a
//                   process-wide `std::sync::Mutex`.
//   no-lock (NL)  — each thread keeps its own free list in a
//                   `std::thread_local`, so concurrent callers never contend
//                   with one another, at the cost of blocks freed by one
//                   thread only being reusable by that same thread.
//
// Both strategies run the exact same split/coalesce logic against a root
// reference (see `engine`); they differ only in which root they hand it and
// whether a lock surrounds the call (see `facade`).
//
// The public surface is `facade`'s safe, typed functions plus a set of
// `extern "C"` shims kept ABI-compatible with the original `ts_malloc_lock`
// family, for callers that need the C calling convention.
// =============================================================================

mod accounting;
mod block;
pub mod error;
mod extender;
mod facade;
mod free_list;
mod engine;

#[cfg(test)]
mod test_support;

use std::cell::RefCell;
use std::ptr;
use std::sync::Mutex;

use accounting::Accounting;
use block::BlockHeader;
use extender::{Extender, Sbrk};

pub use error::AllocError;
pub use facade::{
    allocate_locked, allocate_nolocked, data_segment_free_space_size, data_segment_size,
    deallocate_locked, deallocate_nolocked,
};

/// Newtype around the global free-list root.
///
/// A raw pointer is not `Send` by default, but this one only ever moves
/// between threads while wrapped in the [`Mutex`] below, which is the
/// synchronization that makes sharing it sound.
struct GlobalRoot(*mut BlockHeader);

// SAFETY: access to the wrapped pointer is always serialized by `Context`'s
// mutex; see `GlobalRoot`'s doc comment.
unsafe impl Send for GlobalRoot {}

/// Everything the locked and no-lock facades share: the break extender and
/// the allocation counters. The free-list root itself is *not* here for the
/// NL path — each thread owns its own (see [`NL_ROOT`]) — but the LL path's
/// single shared root lives in `root`.
pub(crate) struct Context<B: extender::BreakSource> {
    root: Mutex<GlobalRoot>,
    extender: Extender<B>,
    accounting: Accounting,
}

impl<B: extender::BreakSource> Context<B> {
    const fn new(source: B) -> Self {
        Self {
            root: Mutex::new(GlobalRoot(ptr::null_mut())),
            extender: Extender::new(source),
            accounting: Accounting::new(),
        }
    }
}

/// The process-wide context backing the locked (LL) API and the accounting
/// queried by `data_segment_size`/`data_segment_free_space_size`.
static CONTEXT: Context<Sbrk> = Context::new(Sbrk);

thread_local! {
    /// Per-thread free-list root backing the no-lock (NL) API. Never shared
    /// across threads, so no synchronization guards it.
    static NL_ROOT: RefCell<*mut BlockHeader> = const { RefCell::new(ptr::null_mut()) };
}
