//! Simulated machine layout
//!
//! A [`MemoryLayout`] fixes the geometry of one simulation run: page size,
//! physical memory size, the bound of every process address space and the
//! size of the stack segment handed to new processes. It is validated once
//! at construction and never changes afterwards.
//!
//! ## Page arithmetic
//!
//! The page size is a power of two, so page numbers and offsets are a shift
//! and a mask. A region of `size` bytes at `addr` touches pages
//! `addr / page_size ..= (addr + size - 1) / page_size`.

use core::ops::RangeInclusive;

use static_assertions::const_assert;
use vmsim_api::error::invalid_config;
use vmsim_api::{FrameNum, PageNum, PhysAddr, Result, Size, VirtAddr};

/// Smallest accepted page size
pub const MIN_PAGE_SIZE: Size = 1024;
/// Largest accepted page size
pub const MAX_PAGE_SIZE: Size = 32768;
/// Page size used by [`MemoryLayout::default`]
pub const DEFAULT_PAGE_SIZE: Size = 4096;
/// Simulated RAM size (64 MiB)
pub const DEFAULT_MEMORY_SIZE: Size = 64 * 1024 * 1024;
/// Size of the `<STACK>` segment of a new process
pub const DEFAULT_STACK_SIZE: Size = 65536;

const_assert!(MIN_PAGE_SIZE.is_power_of_two());
const_assert!(MAX_PAGE_SIZE.is_power_of_two());
const_assert!(DEFAULT_MEMORY_SIZE % MAX_PAGE_SIZE == 0);
const_assert!(DEFAULT_STACK_SIZE <= DEFAULT_MEMORY_SIZE);

/// Geometry of one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    page_size: Size,
    page_shift: u32,
    memory_size: Size,
    address_space_bound: Size,
    stack_size: Size,
}

impl MemoryLayout {
    /// Create a layout with the given page size and the default 64 MiB of RAM
    ///
    /// # Errors
    /// Returns [`InvalidConfig`](vmsim_api::Error::InvalidConfig) if the page
    /// size is not a power of two between 1024 and 32768.
    pub fn new(page_size: Size) -> Result<Self> {
        Self::with_memory_size(page_size, DEFAULT_MEMORY_SIZE)
    }

    /// Create a layout with an explicit physical memory size
    ///
    /// The per-process address bound starts out equal to the memory size.
    pub fn with_memory_size(page_size: Size, memory_size: Size) -> Result<Self> {
        if !page_size.is_power_of_two() || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(invalid_config(
                "page size must be a power of two between 1024 and 32768",
            ));
        }
        if memory_size == 0 || memory_size % page_size != 0 {
            return Err(invalid_config(
                "memory size must be a non-zero multiple of the page size",
            ));
        }

        Ok(Self {
            page_size,
            page_shift: page_size.trailing_zeros(),
            memory_size,
            address_space_bound: memory_size,
            stack_size: DEFAULT_STACK_SIZE.min(memory_size),
        })
    }

    /// Override the per-process address space bound
    ///
    /// The stack segment is clamped so it still fits under the new bound.
    pub fn with_address_space_bound(mut self, bound: Size) -> Result<Self> {
        if bound == 0 {
            return Err(invalid_config("address space bound must be non-zero"));
        }
        self.address_space_bound = bound;
        self.stack_size = self.stack_size.min(bound);
        Ok(self)
    }

    /// Override the stack segment size
    pub fn with_stack_size(mut self, stack_size: Size) -> Result<Self> {
        if stack_size == 0 || stack_size > self.address_space_bound {
            return Err(invalid_config(
                "stack size must be non-zero and fit in the address space",
            ));
        }
        self.stack_size = stack_size;
        Ok(self)
    }

    /// Page (and frame) size in bytes
    #[inline]
    pub const fn page_size(&self) -> Size {
        self.page_size
    }

    /// Simulated RAM size in bytes
    #[inline]
    pub const fn memory_size(&self) -> Size {
        self.memory_size
    }

    /// Size of every process address space
    #[inline]
    pub const fn address_space_bound(&self) -> Size {
        self.address_space_bound
    }

    /// Size of the `<STACK>` segment
    #[inline]
    pub const fn stack_size(&self) -> Size {
        self.stack_size
    }

    /// Number of physical frames
    #[inline]
    pub const fn frame_count(&self) -> usize {
        self.memory_size >> self.page_shift
    }

    /// Page number containing a virtual address
    #[inline]
    pub const fn page_number(&self, addr: VirtAddr) -> PageNum {
        addr >> self.page_shift
    }

    /// Offset of an address within its page
    #[inline]
    pub const fn page_offset(&self, addr: VirtAddr) -> usize {
        addr & (self.page_size - 1)
    }

    /// First virtual address of a page
    #[inline]
    pub const fn page_base(&self, page: PageNum) -> VirtAddr {
        page << self.page_shift
    }

    /// First physical address of a frame
    #[inline]
    pub const fn frame_base(&self, frame: FrameNum) -> PhysAddr {
        frame << self.page_shift
    }

    /// Pages touched by `size` bytes starting at `addr`
    ///
    /// `size` must be non-zero.
    pub fn pages_spanning(&self, addr: VirtAddr, size: Size) -> RangeInclusive<PageNum> {
        debug_assert!(size > 0, "empty ranges touch no pages");
        self.page_number(addr)..=self.page_number(addr + size - 1)
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_shift: DEFAULT_PAGE_SIZE.trailing_zeros(),
            memory_size: DEFAULT_MEMORY_SIZE,
            address_space_bound: DEFAULT_MEMORY_SIZE,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmsim_api::Error;

    #[test]
    fn test_page_size_validation() {
        for page_size in [1024, 2048, 4096, 8192, 16384, 32768] {
            assert!(MemoryLayout::new(page_size).is_ok());
        }
        for page_size in [0, 512, 1000, 3072, 65536] {
            assert!(matches!(MemoryLayout::new(page_size), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_memory_size_validation() {
        assert!(MemoryLayout::with_memory_size(1024, 0).is_err());
        assert!(MemoryLayout::with_memory_size(1024, 1500).is_err());
        let layout = MemoryLayout::with_memory_size(1024, 8192).unwrap();
        assert_eq!(layout.frame_count(), 8);
        assert_eq!(layout.address_space_bound(), 8192);
        assert_eq!(layout.stack_size(), 8192);
    }

    #[test]
    fn test_page_arithmetic() {
        let layout = MemoryLayout::new(1024).unwrap();
        assert_eq!(layout.page_number(2047), 1);
        assert_eq!(layout.page_offset(2047), 1023);
        assert_eq!(layout.page_base(3), 3072);
        assert_eq!(layout.frame_base(2), 2048);
        assert_eq!(layout.pages_spanning(0, 2048), 0..=1);
        assert_eq!(layout.pages_spanning(2048, 512), 2..=2);
        assert_eq!(layout.pages_spanning(1000, 100), 0..=1);
    }

    #[test]
    fn test_default_layout() {
        let layout = MemoryLayout::default();
        assert_eq!(layout.page_size(), 4096);
        assert_eq!(layout.memory_size(), 64 * 1024 * 1024);
        assert_eq!(layout.frame_count(), 16384);
        assert_eq!(layout.stack_size(), 65536);
    }

    #[test]
    fn test_overrides() {
        let layout = MemoryLayout::new(1024).unwrap();
        assert!(layout.with_address_space_bound(0).is_err());
        let small = layout.with_address_space_bound(4096).unwrap();
        assert!(small.with_stack_size(8192).is_err());
        assert_eq!(small.with_stack_size(1024).unwrap().stack_size(), 1024);
    }

    #[test]
    fn test_bound_clamps_stack() {
        let layout = MemoryLayout::new(1024)
            .unwrap()
            .with_address_space_bound(32 * 1024)
            .unwrap();
        assert_eq!(layout.address_space_bound(), 32 * 1024);
        assert_eq!(layout.stack_size(), 32 * 1024);
        assert!(layout.stack_size() <= layout.address_space_bound());
    }
}
