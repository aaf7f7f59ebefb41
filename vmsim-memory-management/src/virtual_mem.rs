//! Virtual memory regions
//!
//! A process address space is a list of [`Region`] records. Occupied
//! regions carry a variable name and element type; free space is recorded
//! in the same list under the [`FREE_SPACE_NAME`] tag.

use alloc::string::String;

use vmsim_api::{DataType, PageNum, RegionInfo, Size, VirtAddr};

use crate::layout::MemoryLayout;

/// Name carried by every free marker
pub const FREE_SPACE_NAME: &str = "<FREE_SPACE>";
/// Name of the code segment created with a process
pub const TEXT_SEGMENT: &str = "<TEXT>";
/// Name of the global data segment created with a process
pub const GLOBALS_SEGMENT: &str = "<GLOBALS>";
/// Name of the stack segment created with a process
pub const STACK_SEGMENT: &str = "<STACK>";

/// Occupancy of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegionKind {
    /// Unoccupied space
    Free,
    /// A variable holding elements of the given type
    Occupied(DataType),
}

/// A contiguous run of virtual addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    name: String,
    address: VirtAddr,
    size: Size,
    kind: RegionKind,
}

impl Region {
    /// Creates a free marker
    pub fn free(address: VirtAddr, size: Size) -> Self {
        Self {
            name: FREE_SPACE_NAME.into(),
            address,
            size,
            kind: RegionKind::Free,
        }
    }

    /// Creates an occupied region
    pub fn occupied(name: &str, address: VirtAddr, size: Size, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            address,
            size,
            kind: RegionKind::Occupied(data_type),
        }
    }

    /// Variable name, or [`FREE_SPACE_NAME`]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start address
    pub fn address(&self) -> VirtAddr {
        self.address
    }

    /// Size in bytes
    pub fn size(&self) -> Size {
        self.size
    }

    /// One past the last address
    pub fn end(&self) -> VirtAddr {
        self.address + self.size
    }

    /// Element type of an occupied region
    pub fn data_type(&self) -> Option<DataType> {
        match self.kind {
            RegionKind::Free => None,
            RegionKind::Occupied(ty) => Some(ty),
        }
    }

    /// Returns true for free markers
    pub fn is_free(&self) -> bool {
        self.kind == RegionKind::Free
    }

    /// Returns true if the region shares at least one byte with `[start, end)`
    pub fn overlaps(&self, start: VirtAddr, end: VirtAddr) -> bool {
        self.address < end && start < self.end()
    }

    /// Returns true if the region shares at least one byte with `page`
    pub fn overlaps_page(&self, page: PageNum, layout: &MemoryLayout) -> bool {
        let start = layout.page_base(page);
        self.overlaps(start, start + layout.page_size())
    }

    pub(crate) fn mark_free(&mut self) {
        self.name = FREE_SPACE_NAME.into();
        self.kind = RegionKind::Free;
    }

    pub(crate) fn shrink_front(&mut self, by: Size) {
        debug_assert!(by < self.size);
        self.address += by;
        self.size -= by;
    }

    pub(crate) fn grow(&mut self, by: Size) {
        self.size += by;
    }

    /// Detached copy for listings
    pub fn info(&self) -> RegionInfo {
        RegionInfo {
            name: self.name.clone(),
            address: self.address,
            size: self.size,
            data_type: self.data_type(),
        }
    }
}

/// Returns true if `name` lies in the namespace reserved for fixed segments
/// and free markers
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with('<')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap() {
        let region = Region::occupied("x", 100, 50, DataType::Char);
        assert!(region.overlaps(149, 200));
        assert!(!region.overlaps(150, 200));
        assert!(!region.overlaps(0, 100));
        assert!(region.overlaps(0, 101));
    }

    #[test]
    fn test_overlaps_page() {
        let layout = MemoryLayout::new(1024).unwrap();
        let region = Region::occupied("x", 1000, 48, DataType::Int);
        assert!(region.overlaps_page(0, &layout));
        assert!(region.overlaps_page(1, &layout));
        assert!(!region.overlaps_page(2, &layout));
    }

    #[test]
    fn test_mark_free() {
        let mut region = Region::occupied("values", 0, 16, DataType::Long);
        region.mark_free();
        assert!(region.is_free());
        assert_eq!(region.name(), FREE_SPACE_NAME);
        assert_eq!((region.address(), region.size()), (0, 16));
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_name(TEXT_SEGMENT));
        assert!(is_reserved_name(FREE_SPACE_NAME));
        assert!(!is_reserved_name("buffer"));
    }
}
