//! The page allocator service.

use crate::error::{AllocError, InvalidPage, invariant_violation};
use crate::free_list::FreeList;
use crate::layout::Layout;
use crate::ref_table::{PageRefTable, RefCount};
use crate::{PageStats, PhysRange, PhysicalAddress};
use core::ptr;
use kernel_info::memory::{ALLOC_POISON, FREE_POISON, PAGE_SIZE};
use kernel_sync::SpinLock;

/// State guarded by the allocator lock.
struct Kmem {
    free: FreeList,
    refs: PageRefTable,
}

// Safety: the raw pointers inside are only dereferenced while the lock is held.
unsafe impl Send for Kmem {}

/// Reference-counting allocator for whole physical pages.
///
/// One instance is built during boot with [`init`](Self::init) and lives
/// for the rest of the kernel's lifetime. All methods take `&self` and may be
/// called from any number of CPUs at once.
///
/// # Locking
/// A single [`SpinLock`] guards the free list and the reference table. Page
/// contents are scrubbed outside of it. `free` therefore takes the lock twice:
/// once to drop the reference and once to push the page. Between the two the
/// page is in *limbo*: its count is zero but it is not yet on the free list,
/// so neither `alloc` nor any other caller can reach it.
pub struct PageAllocator {
    kmem: SpinLock<Kmem>,
    /// Allocatable pages. Never changes after `init`.
    usable: PhysRange,
    /// Bytes in front of `usable` holding the reference table.
    reserved: usize,
}

impl PageAllocator {
    /// Take over `range` and make every whole page in it allocatable.
    ///
    /// The front of the range is reserved for the reference table. Every page
    /// behind it is released once through [`free`](Self::free), which puts
    /// it on the free list since its count starts at zero.
    ///
    /// # Safety
    /// - `range` must be valid, writable physical memory, identity mapped.
    /// - Nothing else may use any byte of `range` for as long as the
    ///   allocator or any page it handed out is alive.
    ///
    /// # Panics
    /// If `range` starts at address zero.
    #[must_use]
    pub unsafe fn init(range: PhysRange) -> Self {
        if range.start() == PhysicalAddress::new(0) {
            log::error!("Refusing to manage physical memory {range:?} starting at address zero");
            panic!("page allocator range must not start at address zero");
        }

        let layout = Layout::plan(range);
        let refs = unsafe { PageRefTable::carve(layout.table, layout.pages()) };
        let this = Self {
            kmem: SpinLock::named("kmem", Kmem {
                free: FreeList::new(),
                refs,
            }),
            usable: layout.usable,
            reserved: layout.reserved(),
        };

        debug_assert_eq!(this.kmem.with_lock(|kmem| kmem.refs.len()), layout.pages());
        for page in layout.usable.pages() {
            unsafe { this.free(page) };
        }

        if layout.pages() == 0 {
            log::warn!("Physical memory {range:?} is too small to hold any allocatable page");
        }
        log::info!(
            "Physical memory {range:?}: {} KiB page table at {}, {} pages in {:?}",
            this.reserved / 1024,
            layout.table,
            layout.pages(),
            layout.usable
        );
        this
    }

    /// Hand out one page with a reference count of one.
    ///
    /// The page is filled with [`ALLOC_POISON`].
    ///
    /// # Errors
    /// [`AllocError::OutOfMemory`] when no page is free.
    pub fn alloc(&self) -> Result<PhysicalAddress, AllocError> {
        let page = self.kmem.with_lock(|kmem| {
            let page = kmem.free.pop()?;
            kmem.refs.set(self.index_unchecked(page), 1);
            Some(page)
        });

        let Some(page) = page else {
            log::debug!("Physical page allocation failed: no free pages left");
            return Err(AllocError::OutOfMemory);
        };

        // Safety: popping the page made us its only owner.
        unsafe { fill(page, ALLOC_POISON) };
        log::trace!("Allocated page {page}");
        Ok(page)
    }

    /// Like [`alloc`](Self::alloc), but the page is all zeroes.
    ///
    /// # Errors
    /// [`AllocError::OutOfMemory`] when no page is free.
    pub fn alloc_zeroed(&self) -> Result<PhysicalAddress, AllocError> {
        let page = self.alloc()?;
        // Safety: freshly allocated, the caller does not know the page yet.
        unsafe { fill(page, 0) };
        Ok(page)
    }

    /// Drop one reference to `page`; return it to the free list once no
    /// references are left.
    ///
    /// The count is only decremented while it is positive. A page whose
    /// count already is zero goes straight back onto the free list.
    ///
    /// # Safety
    /// - The caller must own one reference to `page`, obtained from
    ///   [`alloc`](Self::alloc) or [`increment_ref`](Self::increment_ref),
    ///   and must not touch the page afterwards.
    /// - A page whose count is zero must not already be on the free list.
    ///
    /// # Panics
    /// If `page` is not page aligned or outside the usable range. The
    /// allocator state is left untouched in that case.
    #[track_caller]
    pub unsafe fn free(&self, page: PhysicalAddress) {
        let index = match self.page_index(page) {
            Ok(index) => index,
            Err(err) => invariant_violation("free", err),
        };

        let remaining = self.kmem.with_lock(|kmem| kmem.refs.release(index));
        if remaining > 0 {
            log::trace!("Released page {page}, {remaining} references left");
            return;
        }

        // limbo: unreferenced, but not yet reachable through the free list
        unsafe { fill(page, FREE_POISON) };

        self.kmem.with_lock(|kmem| unsafe { kmem.free.push(page) });
        log::trace!("Freed page {page}");
    }

    /// Register one more owner of `page`.
    ///
    /// Each owner releases its reference with its own call to
    /// [`free`](Self::free).
    ///
    /// # Safety
    /// `page` must currently be allocated and the caller must hold a
    /// reference to it.
    ///
    /// # Panics
    /// If `page` is not page aligned, outside the usable range, or its count
    /// would overflow. The allocator state is left untouched in that case.
    #[track_caller]
    pub unsafe fn increment_ref(&self, page: PhysicalAddress) {
        let index = match self.page_index(page) {
            Ok(index) => index,
            Err(err) => invariant_violation("increment_ref", err),
        };

        match self.kmem.with_lock(|kmem| kmem.refs.increment(index)) {
            Some(count) => log::trace!("Shared page {page}, {count} references"),
            None => invariant_violation("increment_ref", InvalidPage::RefCountOverflow(page)),
        }
    }

    /// Current number of references to `page`.
    ///
    /// # Panics
    /// If `page` is not page aligned or outside the usable range.
    #[track_caller]
    #[must_use]
    pub fn ref_count(&self, page: PhysicalAddress) -> RefCount {
        let index = match self.page_index(page) {
            Ok(index) => index,
            Err(err) => invariant_violation("ref_count", err),
        };
        self.kmem.with_lock(|kmem| kmem.refs.get(index))
    }

    /// Whether `page` is on the free list. Walks the whole list.
    ///
    /// # Panics
    /// If `page` is not page aligned or outside the usable range.
    #[track_caller]
    #[must_use]
    pub fn is_free(&self, page: PhysicalAddress) -> bool {
        if let Err(err) = self.page_index(page) {
            invariant_violation("is_free", err);
        }
        self.kmem.with_lock(|kmem| kmem.free.contains(page))
    }

    /// Snapshot of the allocator's occupancy.
    #[must_use]
    pub fn stats(&self) -> PageStats {
        let free_pages = self.kmem.with_lock(|kmem| kmem.free.len());
        PageStats {
            total_pages: self.total_pages(),
            free_pages,
            reserved_bytes: self.reserved,
        }
    }

    /// The pages this allocator hands out.
    #[inline]
    #[must_use]
    pub const fn usable_range(&self) -> PhysRange {
        self.usable
    }

    #[inline]
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.usable.len() / PAGE_SIZE
    }

    /// Table index of `page`, or why `page` cannot be one of ours.
    fn page_index(&self, page: PhysicalAddress) -> Result<usize, InvalidPage> {
        if !page.is_page_aligned() {
            return Err(InvalidPage::Misaligned(page));
        }
        if page < self.usable.start() {
            return Err(InvalidPage::BelowRange {
                page,
                start: self.usable.start(),
            });
        }
        if page >= self.usable.end() {
            return Err(InvalidPage::AboveRange {
                page,
                end: self.usable.end(),
            });
        }
        Ok((page - self.usable.start()) / PAGE_SIZE)
    }

    /// Table index of a page taken from our own free list.
    #[inline]
    fn index_unchecked(&self, page: PhysicalAddress) -> usize {
        debug_assert!(self.usable.contains(page) && page.is_page_aligned());
        (page - self.usable.start()) / PAGE_SIZE
    }
}

/// Overwrite the whole page with `byte`.
///
/// # Safety
/// The caller must exclusively own `page`.
#[inline]
unsafe fn fill(page: PhysicalAddress, byte: u8) {
    unsafe { ptr::write_bytes(page.as_mut_ptr::<u8>(), byte, PAGE_SIZE) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(4096))]
    struct Frame([u8; PAGE_SIZE]);

    fn with_allocator(frames: usize, f: impl FnOnce(&PageAllocator)) {
        let mut ram: Vec<Frame> = (0..frames).map(|_| Frame([0; PAGE_SIZE])).collect();
        let start = PhysicalAddress::from_ptr(ram.as_mut_ptr());
        let range = PhysRange::new(start, start + frames * PAGE_SIZE);
        let alloc = unsafe { PageAllocator::init(range) };
        f(&alloc);
    }

    #[test]
    fn page_index_counts_from_first_usable_page() {
        with_allocator(8, |a| {
            let start = a.usable_range().start();
            assert_eq!(a.page_index(start), Ok(0));
            assert_eq!(a.page_index(start + 3 * PAGE_SIZE), Ok(3));
            assert_eq!(a.page_index(start + 6 * PAGE_SIZE), Ok(6));
        });
    }

    #[test]
    fn page_index_rejects_foreign_addresses() {
        with_allocator(8, |a| {
            let usable = a.usable_range();
            assert_eq!(
                a.page_index(usable.start() + 1),
                Err(InvalidPage::Misaligned(usable.start() + 1))
            );
            assert_eq!(
                a.page_index(PhysicalAddress::new(PAGE_SIZE)),
                Err(InvalidPage::BelowRange {
                    page: PhysicalAddress::new(PAGE_SIZE),
                    start: usable.start(),
                })
            );
            assert_eq!(
                a.page_index(usable.end()),
                Err(InvalidPage::AboveRange {
                    page: usable.end(),
                    end: usable.end(),
                })
            );
        });
    }

    #[test]
    fn reference_table_matches_page_count() {
        with_allocator(8, |a| {
            let len = a.kmem.with_lock(|kmem| kmem.refs.len());
            assert_eq!(len, a.total_pages());
            assert_eq!(a.stats().free_pages, 7);
        });
    }

    #[test]
    #[should_panic(expected = "reference count of")]
    fn overflowing_reference_count_is_fatal() {
        with_allocator(4, |a| {
            let page = a.alloc().unwrap();
            let index = a.index_unchecked(page);
            a.kmem.with_lock(|kmem| kmem.refs.set(index, RefCount::MAX));
            unsafe { a.increment_ref(page) };
        });
    }
}
