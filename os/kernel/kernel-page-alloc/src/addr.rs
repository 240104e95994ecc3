use core::fmt;
use core::ops::{Add, AddAssign, Sub};
use core::ptr::NonNull;
use kernel_info::memory::PAGE_SIZE;

/// Physical memory address.
///
/// Physical memory is identity mapped while the page allocator runs, so the
/// address doubles as a pointer to the page's bytes. The wrapper keeps page
/// addresses apart from plain integers and sizes.
///
/// ### Examples
/// ```rust
/// # use kernel_page_alloc::PhysicalAddress;
/// let pa = PhysicalAddress::new(0x8000_1234);
/// assert!(!pa.is_page_aligned());
/// assert_eq!(pa.align_down().as_usize(), 0x8000_1000);
/// assert_eq!(pa.align_up().as_usize(), 0x8000_2000);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(usize);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: usize) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr.expose_provenance())
    }

    #[inline]
    #[must_use]
    pub fn from_nonnull<T>(ptr: NonNull<T>) -> Self {
        Self::from_ptr(ptr.as_ptr())
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Pointer to the bytes at this address.
    ///
    /// Creating the pointer is safe; dereferencing it is only sound while the
    /// caller owns the memory behind it.
    #[inline]
    #[must_use]
    pub fn as_mut_ptr<T>(self) -> *mut T {
        core::ptr::with_exposed_provenance_mut(self.0)
    }

    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        self.0 & (PAGE_SIZE - 1) == 0
    }

    /// Round down to the start of the containing page.
    #[inline]
    #[must_use]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !(PAGE_SIZE - 1))
    }

    /// Round up to the next page boundary.
    ///
    /// ### Preconditions
    /// `self + PAGE_SIZE - 1` must not overflow.
    #[inline]
    #[must_use]
    pub const fn align_up(self) -> Self {
        Self((self.0 + PAGE_SIZE - 1) & !(PAGE_SIZE - 1))
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<usize> for PhysicalAddress {
    #[inline]
    fn from(v: usize) -> Self {
        Self::new(v)
    }
}

impl Add<usize> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: usize) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<usize> for PhysicalAddress {
    #[inline]
    fn add_assign(&mut self, rhs: usize) {
        self.0 += rhs;
    }
}

/// Distance in bytes between two addresses.
impl Sub for PhysicalAddress {
    type Output = usize;
    #[inline]
    fn sub(self, rhs: Self) -> usize {
        self.0 - rhs.0
    }
}

/// Half-open range `[start, end)` of physical memory.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct PhysRange {
    start: PhysicalAddress,
    end: PhysicalAddress,
}

impl PhysRange {
    /// An `end` below `start` is clamped to an empty range.
    #[must_use]
    pub fn new(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> PhysicalAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        self.end
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.0 - self.start.0
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, addr: PhysicalAddress) -> bool {
        self.start <= addr && addr < self.end
    }

    /// Start addresses of every whole page in the range, assuming `start`
    /// is page aligned.
    pub fn pages(&self) -> impl Iterator<Item = PhysicalAddress> + use<> {
        let start = self.start;
        (0..self.len() / PAGE_SIZE).map(move |i| start + i * PAGE_SIZE)
    }
}

impl fmt::Debug for PhysRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#X}..{:#X}", self.start.0, self.end.0)
    }
}
