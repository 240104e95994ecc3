//! # Kernel synchronization primitives
//!
//! - [`SpinLock`]: named spin lock for short, non-suspending critical sections.
//! - [`SyncOnceCell`]: write-once cell for state built during boot.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;
mod sync_once_cell;

pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
