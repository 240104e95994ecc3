use crate::PhysicalAddress;

/// Recoverable failure of [`PageAllocator::alloc`](crate::PageAllocator::alloc).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("out of physical memory")]
    OutOfMemory,
}

/// A page address that no correct caller could have produced.
///
/// These are never returned to callers; the allocator reports them through
/// [`invariant_violation`] and stops.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPage {
    #[error("{0} is not page aligned")]
    Misaligned(PhysicalAddress),
    #[error("{page} lies below the usable range starting at {start}")]
    BelowRange {
        page: PhysicalAddress,
        start: PhysicalAddress,
    },
    #[error("{page} lies at or above the end of usable memory at {end}")]
    AboveRange {
        page: PhysicalAddress,
        end: PhysicalAddress,
    },
    #[error("reference count of {0} overflowed")]
    RefCountOverflow(PhysicalAddress),
}

/// Fatal path for corrupted or forged page addresses.
///
/// Kept apart from [`AllocError`] so ordinary control flow never depends on
/// it.
#[cold]
#[inline(never)]
#[track_caller]
pub fn invariant_violation(op: &'static str, err: InvalidPage) -> ! {
    log::error!("{op}: {err}");
    panic!("{op}: {err}");
}
