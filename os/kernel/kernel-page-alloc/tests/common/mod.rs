//! Host memory standing in for physical RAM.
#![allow(dead_code)]

use kernel_page_alloc::{PAGE_SIZE, PageAllocator, PhysRange, PhysicalAddress};
use std::ops::Deref;
use std::ptr;

/// A 4 KiB-aligned raw frame.
#[repr(C, align(4096))]
#[derive(Clone)]
pub struct Frame([u8; PAGE_SIZE]);

/// Contiguous, page-aligned frames. Addresses into it play the role of
/// physical addresses.
pub struct TestRam {
    frames: Vec<Frame>,
}

impl TestRam {
    pub fn with_frames(n: usize) -> Self {
        // garbage, so zeroing by the allocator is observable
        Self {
            frames: vec![Frame([0xEE; PAGE_SIZE]); n],
        }
    }

    pub fn start(&mut self) -> PhysicalAddress {
        PhysicalAddress::from_ptr(self.frames.as_mut_ptr())
    }

    pub fn range(&mut self) -> PhysRange {
        let start = self.start();
        PhysRange::new(start, start + self.frames.len() * PAGE_SIZE)
    }
}

/// An allocator together with the memory it manages.
pub struct Fixture {
    // dropped before `ram`
    pub alloc: PageAllocator,
    pub ram: TestRam,
}

impl Deref for Fixture {
    type Target = PageAllocator;
    fn deref(&self) -> &PageAllocator {
        &self.alloc
    }
}

pub fn allocator(frames: usize) -> Fixture {
    let mut ram = TestRam::with_frames(frames);
    let alloc = unsafe { PageAllocator::init(ram.range()) };
    Fixture { alloc, ram }
}

/// Copy of the bytes of `page`.
pub fn read_page(page: PhysicalAddress) -> Vec<u8> {
    let mut buf = vec![0u8; PAGE_SIZE];
    unsafe { ptr::copy_nonoverlapping(page.as_mut_ptr::<u8>(), buf.as_mut_ptr(), PAGE_SIZE) };
    buf
}

pub fn write_page(page: PhysicalAddress, byte: u8) {
    unsafe { ptr::write_bytes(page.as_mut_ptr::<u8>(), byte, PAGE_SIZE) };
}

/// Take every page the allocator has left.
pub fn drain(alloc: &PageAllocator) -> Vec<PhysicalAddress> {
    std::iter::from_fn(|| alloc.alloc().ok()).collect()
}
