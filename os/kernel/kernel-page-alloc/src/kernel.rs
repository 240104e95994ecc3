//! The boot-time allocator instance.
//!
//! Boot code builds exactly one [`PageAllocator`] and installs it here, so
//! code without a reference to it (trap handlers, syscalls) can reach it
//! through [`kmem`].

use crate::{PageAllocator, PhysRange, PhysicalAddress};
use kernel_info::memory::PHYS_TOP;
use kernel_sync::SyncOnceCell;

static KMEM: SyncOnceCell<PageAllocator> = SyncOnceCell::new();

/// Build the allocator over `[kernel_end, PHYS_TOP)` and install it.
///
/// # Safety
/// - `kernel_end` must be the first byte after the kernel image (the linker's
///   `end` symbol) and everything up to [`PHYS_TOP`] must be unused RAM.
/// - Must be called once, on one CPU, before any other CPU touches memory
///   management.
///
/// # Panics
/// If an allocator is already installed.
#[must_use]
pub unsafe fn kinit(kernel_end: PhysicalAddress) -> &'static PageAllocator {
    let range = PhysRange::new(kernel_end, PhysicalAddress::new(PHYS_TOP));
    unsafe { install(PageAllocator::init(range)) }
}

/// Make `alloc` the kernel's page allocator.
///
/// # Safety
/// `alloc` must manage memory that stays valid for the rest of the kernel's
/// lifetime.
///
/// # Panics
/// If an allocator is already installed.
#[must_use]
pub unsafe fn install(alloc: PageAllocator) -> &'static PageAllocator {
    let Ok(kmem) = KMEM.set(alloc) else {
        log::error!("Page allocator installed twice");
        panic!("page allocator already initialized");
    };
    kmem
}

/// The kernel's page allocator.
///
/// # Panics
/// If called before [`kinit`] or [`install`]. There is no sensible state to
/// continue from.
#[track_caller]
#[must_use]
pub fn kmem() -> &'static PageAllocator {
    match KMEM.get() {
        Some(kmem) => kmem,
        None => {
            log::error!("Page allocator used before kinit");
            panic!("page allocator used before init")
        }
    }
}

/// Whether [`kmem`] is ready to use.
#[must_use]
pub fn is_initialized() -> bool {
    KMEM.is_initialized()
}
