//! The allocate/deallocate engine shared by the LL and NL facades.
//!
//! Both variants run the exact same logic against a free-list root; they
//! differ only in *which* root they pass in and whether a global mutex wraps
//! the call (see `facade.rs`). This module never knows which variant is
//! calling it.

use std::ptr;
use std::ptr::NonNull;

use crate::accounting::Accounting;
use crate::block::{self, BlockHeader, HEADER_SIZE};
use crate::error::AllocError;
use crate::extender::{BreakSource, Extender};
use crate::free_list;

/// Satisfy a request of `size` bytes against the free list rooted at `*root`,
/// falling back to `extender` on a miss. Never fails except by OOM from the
/// extender.
pub(crate) unsafe fn allocate<B: BreakSource>(
    root: &mut *mut BlockHeader,
    size: usize,
    accounting: &Accounting,
    extender: &Extender<B>,
) -> Result<NonNull<u8>, AllocError> {
    if let Some((predecessor, found)) = unsafe { free_list::search_best_fit(*root, size) } {
        let found_size = unsafe { (*found).size };

        let block = if found_size == size {
            let block = unsafe { free_list::unlink(root, predecessor) };
            log::trace!("exact-fit match: block of size {size} reused as-is");
            block
        } else if found_size > size + HEADER_SIZE {
            let tail = unsafe { block::split_tail(found, size) };
            log::debug!(
                "split block: remainder {} bytes, carved {size} bytes from tail",
                unsafe { (*found).size }
            );
            tail
        } else {
            let block = unsafe { free_list::unlink(root, predecessor) };
            log::debug!("whole-consume: block of size {found_size} reused for request of {size}");
            block
        };

        accounting.sub_freed(unsafe { (*block).size } + HEADER_SIZE);
        return Ok(unsafe { NonNull::new_unchecked(block::payload_ptr(block)) });
    }

    let block = extender.extend(size, accounting)?;
    Ok(unsafe { NonNull::new_unchecked(block::payload_ptr(block)) })
}

/// Return `ptr`'s block to the free list rooted at `*root`.
///
/// A double-free (the header is already marked available) is silently
/// ignored, per contract — the accounting counters and the free list are left
/// untouched.
pub(crate) unsafe fn deallocate(
    root: &mut *mut BlockHeader,
    ptr: NonNull<u8>,
    accounting: &Accounting,
    current_break: usize,
) {
    let freed = unsafe { block::header_of(ptr.as_ptr()) };

    if unsafe { (*freed).available } {
        log::warn!("double free at {freed:?} ignored");
        return;
    }

    let size = unsafe { (*freed).size };
    accounting.add_freed(size + HEADER_SIZE);

    let forward = unsafe { block::end_addr(freed) } as *mut BlockHeader;
    let forward_in_range = (forward as usize) < current_break;
    let forward_is_root = forward_in_range && ptr::eq(forward, *root);
    let forward_available = forward_in_range && unsafe { (*forward).available };

    if forward_available && !forward_is_root {
        if let Some(predecessor) = unsafe { free_list::predecessor_of(*root, forward) } {
            unsafe { coalesce(root, predecessor, freed, forward) };
            return;
        }
    }

    unsafe { free_list::push_head(root, freed) };
}

/// Merge `forward` into `freed`, which takes `forward`'s place in the list.
unsafe fn coalesce(
    root: &mut *mut BlockHeader,
    predecessor: *mut BlockHeader,
    freed: *mut BlockHeader,
    forward: *mut BlockHeader,
) {
    unsafe {
        let forward_next = (*forward).next_free;
        let merged_size = (*freed).size + (*forward).size + HEADER_SIZE;

        (*freed).size = merged_size;
        (*freed).next_free = forward_next;
        (*freed).available = true;

        (*forward).available = false;
        (*forward).next_free = ptr::null_mut();

        (*predecessor).next_free = freed;
        if ptr::eq(*root, forward) {
            *root = freed;
        }

        log::debug!("coalesced forward neighbor: merged block now {merged_size} bytes");
    }
}
