use crate::{AllocError, PageAllocator, PhysicalAddress};

/// Source of reference-counted physical pages.
///
/// Virtual-memory and process code take this trait instead of a concrete
/// allocator, so they can run against a mock in tests. Returned pages
/// **must** be page aligned.
pub trait PhysPageAlloc {
    /// Allocate one page; its caller holds the only reference.
    ///
    /// # Errors
    /// [`AllocError::OutOfMemory`] when no page is left.
    fn alloc_page(&self) -> Result<PhysicalAddress, AllocError>;

    /// Release one reference to `page`.
    ///
    /// # Safety
    /// The caller must hold a reference to `page` and not use the page
    /// afterwards.
    unsafe fn free_page(&self, page: PhysicalAddress);

    /// Add a reference to an allocated `page`.
    ///
    /// # Safety
    /// The caller must hold a reference to `page`.
    unsafe fn share_page(&self, page: PhysicalAddress);
}

impl PhysPageAlloc for PageAllocator {
    #[inline]
    fn alloc_page(&self) -> Result<PhysicalAddress, AllocError> {
        self.alloc()
    }

    #[inline]
    unsafe fn free_page(&self, page: PhysicalAddress) {
        unsafe { self.free(page) }
    }

    #[inline]
    unsafe fn share_page(&self, page: PhysicalAddress) {
        unsafe { self.increment_ref(page) }
    }
}

impl<A: PhysPageAlloc + ?Sized> PhysPageAlloc for &A {
    #[inline]
    fn alloc_page(&self) -> Result<PhysicalAddress, AllocError> {
        (**self).alloc_page()
    }

    #[inline]
    unsafe fn free_page(&self, page: PhysicalAddress) {
        unsafe { (**self).free_page(page) }
    }

    #[inline]
    unsafe fn share_page(&self, page: PhysicalAddress) {
        unsafe { (**self).share_page(page) }
    }
}
