//! Page table management module
//!
//! A single table maps `(pid, virtual page)` to a physical frame for every
//! process. Frames are drawn from one shared [`BitmapFrameAllocator`], so a
//! frame backs at most one entry at a time, and once assigned a frame never
//! moves until its page is released.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::ops::RangeInclusive;

use vmsim_api::{
    AddressTranslator, Error, FrameAllocator, FrameNum, PageMapping, PageNum, PhysAddr, Pid,
    Result, VirtAddr,
};

use crate::allocator::bitmap::BitmapFrameAllocator;
use crate::layout::MemoryLayout;

/// Global page table with its frame pool
pub struct PageTable {
    layout: MemoryLayout,
    entries: BTreeMap<(Pid, PageNum), FrameNum>,
    frames: BitmapFrameAllocator,
}

impl PageTable {
    /// Create an empty table over `layout.frame_count()` frames
    pub fn new(layout: MemoryLayout) -> Self {
        Self {
            layout,
            entries: BTreeMap::new(),
            frames: BitmapFrameAllocator::new(layout.frame_count()),
        }
    }

    /// Frame backing `page` of `pid`, if mapped
    pub fn frame_of(&self, pid: Pid, page: PageNum) -> Option<FrameNum> {
        self.entries.get(&(pid, page)).copied()
    }

    /// Number of pages in `pages` that have no entry for `pid`
    pub fn unmapped_pages(&self, pid: Pid, pages: RangeInclusive<PageNum>) -> usize {
        pages
            .filter(|&page| !self.entries.contains_key(&(pid, page)))
            .count()
    }

    /// Maps every unmapped page of `pages` to the lowest free frame
    ///
    /// Pages already mapped keep their frame. Returns the newly assigned
    /// frames. If the pool cannot cover every missing page the table is left
    /// untouched and [`Error::OutOfFrames`] is returned.
    pub fn ensure_mapped(&mut self, pid: Pid, pages: RangeInclusive<PageNum>) -> Result<Vec<FrameNum>> {
        if self.unmapped_pages(pid, pages.clone()) > self.frames.free_frames() {
            log::warn!(
                "pid {}: {} free frames cannot cover pages {:?}",
                pid,
                self.frames.free_frames(),
                pages
            );
            return Err(Error::OutOfFrames);
        }

        let mut assigned = Vec::new();
        for page in pages {
            if self.entries.contains_key(&(pid, page)) {
                continue;
            }
            let frame = self.frames.alloc_frame()?;
            self.entries.insert((pid, page), frame);
            log::trace!("pid {}: page {} -> frame {}", pid, page, frame);
            assigned.push(frame);
        }
        Ok(assigned)
    }

    /// Removes the entries for `pages` and returns their frames to the pool
    ///
    /// The caller must already know that no occupied region of `pid` still
    /// overlaps any of these pages. Returns the number of entries removed.
    pub fn release_pages<I>(&mut self, pid: Pid, pages: I) -> usize
    where
        I: IntoIterator<Item = PageNum>,
    {
        pages
            .into_iter()
            .filter_map(|page| self.unmap(pid, page))
            .count()
    }

    /// Removes one entry and frees its frame
    pub fn unmap(&mut self, pid: Pid, page: PageNum) -> Option<FrameNum> {
        let frame = self.entries.remove(&(pid, page))?;
        if let Err(err) = self.frames.free_frame(frame) {
            log::error!("pid {}: frame {} of page {}: {}", pid, frame, page, err);
        }
        log::trace!("pid {}: unmapped page {} (frame {})", pid, page, frame);
        Some(frame)
    }

    /// Drops every entry of `pid`, returning how many there were
    pub fn remove_process(&mut self, pid: Pid) -> usize {
        let pages: Vec<PageNum> = self
            .entries
            .range((pid, PageNum::MIN)..=(pid, PageNum::MAX))
            .map(|(&(_, page), _)| page)
            .collect();
        self.release_pages(pid, pages)
    }

    /// Live entries ordered by pid, then page
    pub fn mappings(&self) -> impl Iterator<Item = PageMapping> + '_ {
        self.entries
            .iter()
            .map(|(&(pid, page), &frame)| PageMapping { pid, page, frame })
    }

    /// Number of pages mapped for `pid`
    pub fn mapped_pages(&self, pid: Pid) -> usize {
        self.entries
            .range((pid, PageNum::MIN)..=(pid, PageNum::MAX))
            .count()
    }

    /// Frames still available
    pub fn free_frames(&self) -> usize {
        self.frames.free_frames()
    }

    /// Returns true if `frame` currently backs some entry
    pub fn frame_in_use(&self, frame: FrameNum) -> bool {
        self.frames.is_allocated(frame)
    }
}

impl AddressTranslator for PageTable {
    fn translate(&self, pid: Pid, addr: VirtAddr) -> Result<PhysAddr> {
        let page = self.layout.page_number(addr);
        let frame = self
            .frame_of(pid, page)
            .ok_or(Error::UnmappedTranslation { pid, address: addr })?;
        Ok(self.layout.frame_base(frame) + self.layout.page_offset(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(frames: usize) -> PageTable {
        PageTable::new(MemoryLayout::with_memory_size(1024, frames * 1024).unwrap())
    }

    #[test]
    fn test_ensure_mapped_assigns_lowest_frames() {
        let mut table = table(16);
        assert_eq!(table.ensure_mapped(1024, 0..=1), Ok(vec![0, 1]));
        assert_eq!(table.ensure_mapped(1024, 1..=2), Ok(vec![2]));
        assert_eq!(table.ensure_mapped(1025, 0..=0), Ok(vec![3]));
        assert_eq!(table.frame_of(1024, 1), Some(1));
        assert_eq!(table.mapped_pages(1024), 3);
    }

    #[test]
    fn test_released_frames_are_reused() {
        let mut table = table(16);
        table.ensure_mapped(1024, 0..=3).unwrap();
        assert_eq!(table.release_pages(1024, [1, 2]), 2);
        assert_eq!(table.ensure_mapped(1025, 0..=2), Ok(vec![1, 2, 4]));
        assert_eq!(table.release_pages(1024, [1]), 0);
    }

    #[test]
    fn test_translate() {
        let mut table = table(16);
        table.ensure_mapped(1024, 0..=0).unwrap();
        table.ensure_mapped(1025, 0..=0).unwrap();
        table.ensure_mapped(1024, 1..=1).unwrap();
        assert_eq!(table.translate(1024, 10), Ok(10));
        assert_eq!(table.translate(1025, 10), Ok(1024 + 10));
        assert_eq!(table.translate(1024, 1024 + 1023), Ok(2 * 1024 + 1023));
        assert_eq!(
            table.translate(1024, 2048),
            Err(Error::UnmappedTranslation { pid: 1024, address: 2048 })
        );
        assert!(table.translate(1026, 0).is_err());
    }

    #[test]
    fn test_out_of_frames_maps_nothing() {
        let mut table = table(4);
        table.ensure_mapped(1024, 0..=2).unwrap();
        assert_eq!(table.ensure_mapped(1025, 0..=1), Err(Error::OutOfFrames));
        assert_eq!(table.mapped_pages(1025), 0);
        assert_eq!(table.free_frames(), 1);
        assert_eq!(table.ensure_mapped(1025, 0..=0), Ok(vec![3]));
    }

    #[test]
    fn test_remove_process() {
        let mut table = table(16);
        table.ensure_mapped(1024, 0..=2).unwrap();
        table.ensure_mapped(1025, 0..=1).unwrap();
        table.ensure_mapped(1026, 5..=5).unwrap();
        assert_eq!(table.remove_process(1025), 2);
        assert_eq!(table.mapped_pages(1025), 0);
        assert!(!table.frame_in_use(3));
        let remaining: Vec<(Pid, PageNum)> = table.mappings().map(|m| (m.pid, m.page)).collect();
        assert_eq!(remaining, vec![(1024, 0), (1024, 1), (1024, 2), (1026, 5)]);
    }
}
