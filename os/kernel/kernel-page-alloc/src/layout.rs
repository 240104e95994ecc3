//! Splitting the managed range into the reference table and usable pages.

use crate::{PhysRange, PhysicalAddress, ref_table::RefCount};
use core::mem::size_of;
use kernel_info::memory::PAGE_SIZE;

/// Where the reference table and the allocatable pages live.
///
/// ```text
/// range.start   table                  usable.start           usable.end  range.end
///     │ (align) │ RefCount × pages (pad) │ page │ page │ … │ page │ (partial) │
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Base of the reference table; page aligned.
    pub table: PhysicalAddress,
    /// Whole, allocatable pages; one table entry each.
    pub usable: PhysRange,
}

impl Layout {
    /// Reserve as many table entries as there are pages left behind them.
    pub fn plan(range: PhysRange) -> Self {
        let base = range.start().align_up();
        if base >= range.end() {
            return Self {
                table: base,
                usable: PhysRange::new(base, base),
            };
        }

        let avail = range.end() - base;
        let mut pages = avail / (PAGE_SIZE + size_of::<RefCount>());
        // rounding the table up to whole pages may cost one more page
        while pages > 0 && Self::footprint(pages) > avail {
            pages -= 1;
        }

        let usable_start = base + Self::table_bytes(pages);
        Self {
            table: base,
            usable: PhysRange::new(usable_start, usable_start + pages * PAGE_SIZE),
        }
    }

    #[inline]
    pub const fn pages(&self) -> usize {
        self.usable.len() / PAGE_SIZE
    }

    /// Bytes taken by the table, padding included.
    #[inline]
    pub const fn reserved(&self) -> usize {
        self.usable.start().as_usize() - self.table.as_usize()
    }

    const fn table_bytes(pages: usize) -> usize {
        (pages * size_of::<RefCount>()).next_multiple_of(PAGE_SIZE)
    }

    const fn footprint(pages: usize) -> usize {
        Self::table_bytes(pages) + pages * PAGE_SIZE
    }
}
