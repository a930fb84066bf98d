//! Errors this allocator can surface.
//!
//! `DoubleFree` and `InvalidFree` (see the crate's top-level docs) are not
//! represented here: a double-free is handled by silent return, and an
//! invalid free is out of contract (undefined behavior), not a typed failure.

/// The one failure mode a caller can observe: the OS refused to extend the heap.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("the operating system refused to extend the heap")]
    OutOfMemory,
}
