//! # Kernel Memory Configuration
//!
//! Compile-time constants describing the physical memory the kernel manages.
//! Everything here is a `const`, so the values are shared by the kernel, the
//! page allocator and the tests without any runtime setup.
//!
//! ## Physical Memory Layout
//!
//! ```text
//! KERNEL_BASE ┌─────────────────────────────────┐ 0x8000_0000
//!             │       Kernel Image              │
//!             │   (Text, Data, BSS)             │
//! kernel end  ├─────────────────────────────────┤ (linker symbol `end`)
//!             │  Page reference-count table     │
//!             ├─────────────────────────────────┤ (page aligned)
//!             │    Allocatable pages            │
//!             │  (Managed by the page allocator)│
//! PHYS_TOP    └─────────────────────────────────┘ KERNEL_BASE + 128 MiB
//! ```
//!
//! The region between the end of the kernel image and [`PHYS_TOP`](memory::PHYS_TOP)
//! is handed to the page allocator once during boot.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
