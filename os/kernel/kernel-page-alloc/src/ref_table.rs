//! Per-page reference counts, stored in the first pages of the managed range.

use crate::PhysicalAddress;
use core::ptr::{self, NonNull};
use core::slice;

/// Number of owners of one page. Zero means the page is free (or in limbo).
pub type RefCount = u32;

/// Dense array of [`RefCount`]s, one per usable page.
///
/// # Invariants
/// - `counts` points to `len` initialized, exclusively owned entries.
pub struct PageRefTable {
    counts: NonNull<RefCount>,
    len: usize,
}

impl PageRefTable {
    /// Claim `len` entries at `base` and zero them.
    ///
    /// # Safety
    /// - `[base, base + len * size_of::<RefCount>())` must be valid, writable
    ///   and not used by anything else for the lifetime of the table.
    /// - `base` must be aligned for [`RefCount`] and non-null unless `len == 0`.
    pub unsafe fn carve(base: PhysicalAddress, len: usize) -> Self {
        let counts = match NonNull::new(base.as_mut_ptr::<RefCount>()) {
            Some(p) if len > 0 => p,
            _ => NonNull::dangling(),
        };
        unsafe {
            ptr::write_bytes(counts.as_ptr(), 0, len);
        }
        Self { counts, len }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn counts(&self) -> &[RefCount] {
        // Safety: see type invariants.
        unsafe { slice::from_raw_parts(self.counts.as_ptr(), self.len) }
    }

    #[inline]
    fn counts_mut(&mut self) -> &mut [RefCount] {
        // Safety: see type invariants; `&mut self` makes the access unique.
        unsafe { slice::from_raw_parts_mut(self.counts.as_ptr(), self.len) }
    }

    #[inline]
    pub fn get(&self, index: usize) -> RefCount {
        self.counts()[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, count: RefCount) {
        self.counts_mut()[index] = count;
    }

    /// Add one owner. Returns `None` if the count would overflow.
    pub fn increment(&mut self, index: usize) -> Option<RefCount> {
        let count = &mut self.counts_mut()[index];
        *count = count.checked_add(1)?;
        Some(*count)
    }

    /// Drop one owner if there is any, and return the remaining count.
    ///
    /// A count that is already zero stays zero; `init` relies on this to
    /// push never-allocated pages through the regular release path.
    pub fn release(&mut self, index: usize) -> RefCount {
        let count = &mut self.counts_mut()[index];
        if *count > 0 {
            *count -= 1;
        }
        *count
    }
}
