//! Intrusive list of free pages.
//!
//! A free page stores the link to the next free page in its own first
//! machine word:
//!
//! ```text
//! head ──► ┌──────────┬───────────────────┐   ┌──────────┬─────────┐
//!          │ next ────┼──► FREE_POISON …  │──►│ None     │   …     │
//!          └──────────┴───────────────────┘   └──────────┴─────────┘
//! ```
//!
//! The [`FreePage`] view only exists while a page sits in the list. Nothing
//! outside this module ever sees it; callers hand in and get back plain
//! [`PhysicalAddress`]es.

use crate::PhysicalAddress;
use core::marker::PhantomData;
use core::ptr::NonNull;

/// Link header overlaid on the first word of a free page.
#[repr(C)]
struct FreePage {
    next: Option<NonNull<FreePage>>,
}

/// LIFO stack of free pages.
pub struct FreeList {
    head: Option<NonNull<FreePage>>,
    len: usize,
}

impl FreeList {
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Make `page` the new head of the list.
    ///
    /// # Safety
    /// - `page` must be non-null, aligned for a pointer and writable for at
    ///   least one machine word.
    /// - The caller gives up the page: nothing else may read or write it until
    ///   [`pop`](Self::pop) hands it out again.
    /// - `page` must not already be in the list.
    pub unsafe fn push(&mut self, page: PhysicalAddress) {
        let node = page.as_mut_ptr::<FreePage>();
        debug_assert!(!node.is_null(), "free page at address zero");
        unsafe {
            node.write(FreePage { next: self.head });
        }
        self.head = NonNull::new(node);
        self.len += 1;
    }

    /// Detach the head page. Its link word is left as garbage.
    pub fn pop(&mut self) -> Option<PhysicalAddress> {
        let node = self.head?;
        // Safety: every node in the list was written by `push` and is owned
        // by the list until now.
        self.head = unsafe { node.as_ref().next };
        self.len -= 1;
        Some(PhysicalAddress::from_nonnull(node))
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head,
            _list: PhantomData,
        }
    }

    /// Linear search; meant for diagnostics and tests.
    pub fn contains(&self, page: PhysicalAddress) -> bool {
        self.iter().any(|p| p == page)
    }
}

pub struct Iter<'list> {
    next: Option<NonNull<FreePage>>,
    _list: PhantomData<&'list FreeList>,
}

impl Iterator for Iter<'_> {
    type Item = PhysicalAddress;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        // Safety: the borrow of the list keeps every node in place.
        self.next = unsafe { node.as_ref().next };
        Some(PhysicalAddress::from_nonnull(node))
    }
}
