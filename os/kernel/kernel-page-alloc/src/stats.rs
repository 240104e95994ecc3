use core::fmt;
use kernel_info::memory::PAGE_SIZE;

/// Occupancy of a [`PageAllocator`](crate::PageAllocator) at one instant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageStats {
    /// Pages the allocator manages.
    pub total_pages: usize,
    /// Pages on the free list.
    pub free_pages: usize,
    /// Bytes in front of the usable pages taken by the reference table.
    pub reserved_bytes: usize,
}

impl PageStats {
    /// Pages not on the free list, including pages in limbo.
    #[must_use]
    pub const fn allocated_pages(&self) -> usize {
        self.total_pages - self.free_pages
    }
}

impl fmt::Display for PageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} pages free ({} KiB), {} KiB reserved",
            self.free_pages,
            self.total_pages,
            self.free_pages * PAGE_SIZE / 1024,
            self.reserved_bytes / 1024
        )
    }
}
