//! # Memory Layout

/// log2 of [`PAGE_SIZE`].
pub const PAGE_SHIFT: u32 = 12;

/// Size of a single physical page in bytes.
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;

/// Physical address the kernel image is loaded at.
///
/// # Kernel Build
/// This matches the load address of the kernel linker script.
pub const KERNEL_BASE: usize = 0x8000_0000;

/// Amount of RAM the kernel manages, starting at [`KERNEL_BASE`].
pub const PHYS_MEM_SIZE: usize = 128 * 1024 * 1024; // 128 MiB

/// First address above the managed physical memory.
pub const PHYS_TOP: usize = KERNEL_BASE + PHYS_MEM_SIZE;

/// Byte pattern written over every page handed out by the page allocator,
/// so reads of uninitialized memory stand out.
pub const ALLOC_POISON: u8 = 0x05;

/// Byte pattern written over every page returned to the page allocator,
/// so reads through dangling references stand out.
pub const FREE_POISON: u8 = 0x01;

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(KERNEL_BASE.is_multiple_of(PAGE_SIZE));
    assert!(PHYS_TOP.is_multiple_of(PAGE_SIZE));
    assert!(PHYS_TOP > KERNEL_BASE);
    assert!(ALLOC_POISON != FREE_POISON);
};
