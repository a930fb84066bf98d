//! The public API: safe, typed Rust functions plus `extern "C"` ABI shims
//! compatible with the original `ts_malloc_lock` family.
//!
//! `*_locked` functions serialize every caller through [`CONTEXT`]'s global
//! mutex, held for the whole operation (search, split/unlink or push, and any
//! resulting break extension) so no other thread can observe a partially
//! updated free list. `*_nolocked` functions instead operate on the calling
//! thread's own root in [`NL_ROOT`]; no lock is needed there because no other
//! thread can ever reach it.

use std::os::raw::c_void;
use std::ptr::{self, NonNull};

use crate::block::BlockHeader;
use crate::error::AllocError;
use crate::{CONTEXT, NL_ROOT};

/// Allocate `size` bytes from the shared, lock-guarded heap.
pub fn allocate_locked(size: usize) -> Result<NonNull<u8>, AllocError> {
    let mut guard = CONTEXT.root.lock().expect("allocator mutex poisoned");
    unsafe { crate::engine::allocate(&mut guard.0, size, &CONTEXT.accounting, &CONTEXT.extender) }
}

/// Return a block previously returned by [`allocate_locked`].
///
/// # Safety
/// `ptr` must be a pointer previously returned by `allocate_locked` and not
/// already freed.
pub unsafe fn deallocate_locked(ptr: NonNull<u8>) {
    let mut guard = CONTEXT.root.lock().expect("allocator mutex poisoned");
    let current_break = CONTEXT.extender.current_break();
    unsafe { crate::engine::deallocate(&mut guard.0, ptr, &CONTEXT.accounting, current_break) };
}

/// Allocate `size` bytes from the calling thread's own free list.
///
/// Blocks allocated here can only be reused by the same thread that frees
/// them back; no lock is taken because the list is never shared.
pub fn allocate_nolocked(size: usize) -> Result<NonNull<u8>, AllocError> {
    NL_ROOT.with(|cell| {
        let mut root = cell.borrow_mut();
        unsafe { crate::engine::allocate(&mut root, size, &CONTEXT.accounting, &CONTEXT.extender) }
    })
}

/// Return a block previously returned by [`allocate_nolocked`] on this same thread.
///
/// # Safety
/// `ptr` must be a pointer previously returned by `allocate_nolocked` on the
/// calling thread, and not already freed.
pub unsafe fn deallocate_nolocked(ptr: NonNull<u8>) {
    let current_break = CONTEXT.extender.current_break();
    NL_ROOT.with(|cell| {
        let mut root = cell.borrow_mut();
        unsafe { crate::engine::deallocate(&mut root, ptr, &CONTEXT.accounting, current_break) };
    });
}

/// Total bytes ever claimed from the OS via `sbrk`, headers included.
pub fn data_segment_size() -> usize {
    CONTEXT.accounting.total()
}

/// Bytes currently sitting on a free list (either variant), headers included.
pub fn data_segment_free_space_size() -> usize {
    CONTEXT.accounting.freed()
}

fn to_raw(result: Result<NonNull<u8>, AllocError>) -> *mut c_void {
    match result {
        Ok(p) => p.as_ptr() as *mut c_void,
        Err(AllocError::OutOfMemory) => {
            log::error!("allocation failed: heap extension refused by the OS");
            ptr::null_mut()
        }
    }
}

/// # Safety
/// See `malloc(3)`: the returned pointer must eventually be passed to
/// `ts_free_lock` (and only that function), or not freed at all.
#[no_mangle]
pub unsafe extern "C" fn ts_malloc_lock(size: usize) -> *mut c_void {
    to_raw(allocate_locked(size))
}

/// # Safety
/// `ptr` must have come from `ts_malloc_lock` and not already been freed. A
/// null `ptr` is a no-op.
#[no_mangle]
pub unsafe extern "C" fn ts_free_lock(ptr: *mut c_void) {
    if let Some(p) = NonNull::new(ptr as *mut u8) {
        unsafe { deallocate_locked(p) };
    }
}

/// # Safety
/// See `malloc(3)`: the returned pointer must eventually be passed to
/// `ts_free_nolock` (and only that function) from the same thread, or not
/// freed at all.
#[no_mangle]
pub unsafe extern "C" fn ts_malloc_nolock(size: usize) -> *mut c_void {
    to_raw(allocate_nolocked(size))
}

/// # Safety
/// `ptr` must have come from `ts_malloc_nolock` on this same thread and not
/// already been freed. A null `ptr` is a no-op.
#[no_mangle]
pub unsafe extern "C" fn ts_free_nolock(ptr: *mut c_void) {
    if let Some(p) = NonNull::new(ptr as *mut u8) {
        unsafe { deallocate_nolocked(p) };
    }
}

#[no_mangle]
pub extern "C" fn get_data_segment_size() -> std::os::raw::c_ulong {
    data_segment_size() as std::os::raw::c_ulong
}

#[no_mangle]
pub extern "C" fn get_data_segment_free_space_size() -> std::os::raw::c_ulong {
    data_segment_free_space_size() as std::os::raw::c_ulong
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block;
    use crate::test_support::FakeBreak;
    use crate::Context;
    use std::sync::Mutex as StdMutex;

    /// An isolated context for tests, independent of the crate-global
    /// [`CONTEXT`], so assertions about `total`/`freed` never race with other
    /// tests touching the real global.
    struct Local {
        root: StdMutex<*mut BlockHeader>,
        ctx: Context<FakeBreak>,
    }

    impl Local {
        fn new(capacity: usize) -> Self {
            Self {
                root: StdMutex::new(ptr::null_mut()),
                ctx: Context::new(FakeBreak::new(capacity)),
            }
        }

        fn alloc(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
            let mut root = self.root.lock().unwrap();
            unsafe { crate::engine::allocate(&mut root, size, &self.ctx.accounting, &self.ctx.extender) }
        }

        unsafe fn dealloc(&self, p: NonNull<u8>) {
            let mut root = self.root.lock().unwrap();
            let current_break = self.ctx.extender.current_break();
            unsafe { crate::engine::deallocate(&mut root, p, &self.ctx.accounting, current_break) };
        }
    }

    #[test]
    fn locked_round_trip_through_local_context() {
        let local = Local::new(1 << 16);
        let p = local.alloc(128).unwrap();
        assert!(local.ctx.accounting.total() >= 128);
        unsafe { local.dealloc(p) };
        assert!(local.ctx.accounting.freed() > 0);
    }

    #[test]
    fn oom_reports_null_through_the_c_shim() {
        let local = Local::new(block::HEADER_SIZE + 4);
        let first = local.alloc(1_000_000);
        assert!(first.is_err());
    }

    #[test]
    fn global_locked_allocate_and_free_round_trips() {
        let p = allocate_locked(64).expect("global heap extension should succeed in test env");
        unsafe { deallocate_locked(p) };
    }

    #[test]
    fn global_nolocked_allocate_and_free_round_trips() {
        let p = allocate_nolocked(64).expect("global heap extension should succeed in test env");
        unsafe { deallocate_nolocked(p) };
    }

    #[test]
    fn ffi_shim_null_free_is_a_no_op() {
        unsafe {
            ts_free_lock(ptr::null_mut());
            ts_free_nolock(ptr::null_mut());
        }
    }

    #[test]
    fn ffi_shim_round_trips() {
        unsafe {
            let p = ts_malloc_lock(32);
            assert!(!p.is_null());
            ts_free_lock(p);

            let p = ts_malloc_nolock(32);
            assert!(!p.is_null());
            ts_free_nolock(p);
        }
    }
}
