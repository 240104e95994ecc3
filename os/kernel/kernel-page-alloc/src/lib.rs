//! # Physical Page Allocator
//!
//! Hands out whole 4 KiB pages of physical memory to the rest of the kernel:
//! page tables, user process memory, kernel stacks and pipe buffers. Each page
//! carries a reference count, so a page can be shared by several owners
//! (e.g. parent and child after a copy-on-write fork) and only returns to the
//! allocator once the last owner lets go.
//!
//! ## Layout
//!
//! The allocator takes over one contiguous range of RAM during boot and keeps
//! all of its bookkeeping inside that range:
//!
//! ```text
//! range.start                                                      range.end
//! ┌──────────────────────┬────────┬────────┬─────┬────────┬─────────────┐
//! │ reference table      │ page 0 │ page 1 │ ... │ page N │ (partial)   │
//! │ (one u32 per page)   │        │        │     │        │             │
//! └──────────────────────┴────────┴────────┴─────┴────────┴─────────────┘
//!                        ^ usable_range().start()         ^ usable_range().end()
//! ```
//!
//! Free pages are chained into an intrusive singly-linked list whose links
//! live in the first word of each free page.
//!
//! ## Page Lifecycle
//!
//! ```text
//!             alloc               increment_ref
//!   Free ──────────────► Allocated(1) ──────────► Allocated(n + 1)
//!    ▲                        │ ▲                      │
//!    │        free            │ │         free         │
//!    └────────────────────────┘ └──────────────────────┘
//! ```
//!
//! - [`PageAllocator::alloc`] fills the page with [`ALLOC_POISON`].
//! - [`PageAllocator::free`] fills the page with [`FREE_POISON`] when the last
//!   reference is dropped.
//!
//! ## Errors
//!
//! Running out of pages is an ordinary [`AllocError`]. Passing an address that
//! is misaligned or outside the managed pages is a bug elsewhere in the
//! kernel: the allocator logs it and panics.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kernel_page_alloc::kernel;
//!
//! // early boot, single CPU
//! let kmem = unsafe { kernel::kinit(kernel_end) };
//!
//! let page = kmem.alloc()?;
//! unsafe {
//!     kmem.increment_ref(page); // second owner
//!     kmem.free(page);          // first owner done
//!     kmem.free(page);          // second owner done, page is free again
//! }
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod addr;
mod error;
mod free_list;
pub mod kernel;
mod layout;
mod page_alloc;
mod phys_page_alloc;
mod ref_table;
mod stats;

pub use addr::{PhysRange, PhysicalAddress};
pub use error::{AllocError, InvalidPage};
pub use kernel_info::memory::{ALLOC_POISON, FREE_POISON, PAGE_SIZE};
pub use page_alloc::PageAllocator;
pub use phys_page_alloc::PhysPageAlloc;
pub use ref_table::RefCount;
pub use stats::PageStats;
