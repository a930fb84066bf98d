//! Block header layout and the pointer arithmetic that threads it through the heap.
//!
//! A block is a [`BlockHeader`] immediately followed by `size` payload bytes. Every
//! byte between the heap anchor and the current break belongs to exactly one block;
//! walking from a block by `HEADER_SIZE + size` always lands on the next block's
//! header (the tiling invariant).

use std::ptr;

/// Metadata prefixing every block in the managed heap.
///
/// `next_free` is only meaningful while the block is on a free list
/// (`available == true`); for an allocated block it is always null.
#[repr(C)]
pub(crate) struct BlockHeader {
    pub(crate) size: usize,
    pub(crate) available: bool,
    pub(crate) next_free: *mut BlockHeader,
}

pub(crate) const HEADER_SIZE: usize = std::mem::size_of::<BlockHeader>();

/// Address one past the end of `block`'s payload — where the next block's
/// header would begin.
pub(crate) unsafe fn end_addr(block: *mut BlockHeader) -> usize {
    block as usize + HEADER_SIZE + unsafe { (*block).size }
}

/// The pointer handed to callers: the first payload byte.
pub(crate) unsafe fn payload_ptr(block: *mut BlockHeader) -> *mut u8 {
    unsafe { (block as *mut u8).add(HEADER_SIZE) }
}

/// Recover a block's header from a payload pointer previously returned by
/// [`payload_ptr`].
pub(crate) unsafe fn header_of(payload: *mut u8) -> *mut BlockHeader {
    unsafe { payload.sub(HEADER_SIZE) as *mut BlockHeader }
}

/// Carve an allocated block of `size` bytes out of the tail of `block`.
///
/// `block` must already be known to satisfy `block.size > size + HEADER_SIZE`
/// (the caller decides splittable vs. whole-consume). `block` is shrunk in
/// place and stays exactly where it was — its free-list links are untouched —
/// the carved block at its tail is returned, already marked allocated.
pub(crate) unsafe fn split_tail(block: *mut BlockHeader, size: usize) -> *mut BlockHeader {
    unsafe {
        debug_assert!((*block).size > size + HEADER_SIZE);
        (*block).size -= size + HEADER_SIZE;
        let tail = (block as usize + HEADER_SIZE + (*block).size) as *mut BlockHeader;
        (*tail).size = size;
        (*tail).available = false;
        (*tail).next_free = ptr::null_mut();
        tail
    }
}
