//! Memory management unit facade
//!
//! [`Mmu`] owns every piece of simulator state: the process table, the
//! global page table and simulated RAM. Each operation runs to completion
//! and either commits all of its effects or returns an error having changed
//! nothing.
//!
//! A reservation flows allocator -> page table: the first-fit address is
//! looked up, frame availability for the pages it touches is checked, and
//! only then is the region recorded and its pages mapped. A release runs the
//! other way: the region becomes free space, neighbours coalesce, and the
//! pages it touched are unmapped unless another variable still overlaps them.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use vmsim_api::error::invalid_argument;
use vmsim_api::{
    AddressTranslator, DataType, Error, PageMapping, PhysAddr, Pid, ProcessInfo, Result, Size,
    VirtAddr,
};

use crate::allocator::first_fit::ProcessSpace;
use crate::layout::MemoryLayout;
use crate::page_table::PageTable;
use crate::physical::PhysicalMemory;
use crate::virtual_mem::{is_reserved_name, Region, GLOBALS_SEGMENT, STACK_SEGMENT, TEXT_SEGMENT};

/// First pid handed out
pub const FIRST_PID: Pid = 1024;

/// The simulated machine
pub struct Mmu {
    layout: MemoryLayout,
    next_pid: Pid,
    processes: BTreeMap<Pid, ProcessSpace>,
    page_table: PageTable,
    memory: PhysicalMemory,
}

impl Mmu {
    /// Create a machine with no processes
    pub fn new(layout: MemoryLayout) -> Self {
        log::info!(
            "mmu: {} bytes of memory in {} frames of {} bytes",
            layout.memory_size(),
            layout.frame_count(),
            layout.page_size()
        );
        Self {
            layout,
            next_pid: FIRST_PID,
            processes: BTreeMap::new(),
            page_table: PageTable::new(layout),
            memory: PhysicalMemory::new(layout.memory_size()),
        }
    }

    /// Geometry of this machine
    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// Starts an empty process whose address space is one free region
    pub fn create_process(&mut self) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        self.processes
            .insert(pid, ProcessSpace::new(pid, self.layout.address_space_bound()));
        log::info!("pid {}: created", pid);
        pid
    }

    /// Starts a process and lays out its `<TEXT>`, `<GLOBALS>` and `<STACK>`
    /// segments
    ///
    /// A `data_size` of zero skips the globals segment. If any segment cannot
    /// be placed the half-built process is torn down and the error returned.
    pub fn create(&mut self, text_size: Size, data_size: Size) -> Result<Pid> {
        if text_size == 0 {
            return Err(invalid_argument("text size must be non-zero"));
        }

        let pid = self.create_process();
        let segments = [
            (TEXT_SEGMENT, text_size),
            (GLOBALS_SEGMENT, data_size),
            (STACK_SEGMENT, self.layout.stack_size()),
        ];
        for (name, size) in segments {
            if size == 0 {
                continue;
            }
            if let Err(err) = self.reserve(pid, name, size, DataType::Char) {
                self.discard(pid);
                return Err(err);
            }
        }
        Ok(pid)
    }

    /// Reserves `count` elements of `data_type` for a user variable
    ///
    /// Names starting with `<` are reserved for process segments.
    pub fn allocate(&mut self, pid: Pid, name: &str, data_type: DataType, count: usize) -> Result<VirtAddr> {
        if !self.processes.contains_key(&pid) {
            return Err(Error::UnknownProcess(pid));
        }
        if name.is_empty() || is_reserved_name(name) {
            return Err(invalid_argument("variable names must not be empty or start with '<'"));
        }
        let size = data_type
            .size()
            .checked_mul(count)
            .ok_or(Error::AllocationExceedsCapacity(Size::MAX))?;
        self.reserve(pid, name, size, data_type)
    }

    /// Reserves `size` bytes first-fit in the address space of `pid` and maps
    /// every page the new region touches
    pub fn reserve(&mut self, pid: Pid, name: &str, size: Size, data_type: DataType) -> Result<VirtAddr> {
        let space = self.processes.get_mut(&pid).ok_or(Error::UnknownProcess(pid))?;
        if size == 0 {
            return Err(invalid_argument("region size must be non-zero"));
        }
        if space.lookup(name).is_ok() {
            return Err(Error::DuplicateVariable(name.into()));
        }
        let address = space
            .first_fit(size)
            .ok_or(Error::AllocationExceedsCapacity(size))?;

        let pages = self.layout.pages_spanning(address, size);
        if self.page_table.unmapped_pages(pid, pages.clone()) > self.page_table.free_frames() {
            log::warn!("pid {}: not enough frames for {} ({} bytes)", pid, name, size);
            return Err(Error::OutOfFrames);
        }

        let reserved = space.reserve(name, size, data_type)?;
        debug_assert_eq!(reserved, address);

        let assigned = self.page_table.ensure_mapped(pid, pages)?;
        for frame in assigned {
            self.memory
                .clear(self.layout.frame_base(frame), self.layout.page_size())?;
        }
        Ok(address)
    }

    /// Frees a variable and unmaps the pages no other variable still uses
    pub fn release(&mut self, pid: Pid, name: &str) -> Result<()> {
        let space = self.processes.get_mut(&pid).ok_or(Error::UnknownProcess(pid))?;
        let released = space.release(name)?;

        let pages = self
            .layout
            .pages_spanning(released.start, released.end - released.start);
        let (first, last) = (*pages.start(), *pages.end());
        let layout = self.layout;
        let space = &*space;
        let idle = pages.filter(|&page| {
            // interior pages lay wholly inside the released variable
            (page != first && page != last) || !space.page_occupied(page, &layout)
        });
        let unmapped = self.page_table.release_pages(pid, idle);

        log::debug!("pid {}: freed {}, {} pages unmapped", pid, name, unmapped);
        Ok(())
    }

    /// Removes a process together with every frame it held
    pub fn terminate_process(&mut self, pid: Pid) -> Result<()> {
        self.processes.remove(&pid).ok_or(Error::UnknownProcess(pid))?;
        let frames = self.page_table.remove_process(pid);
        log::info!("pid {}: terminated, {} frames released", pid, frames);
        Ok(())
    }

    /// Translates a virtual address of `pid` to a physical address
    pub fn translate(&self, pid: Pid, addr: VirtAddr) -> Result<PhysAddr> {
        self.process(pid)?;
        self.page_table.translate(pid, addr)
    }

    /// Finds a variable of `pid` by name
    pub fn lookup(&self, pid: Pid, name: &str) -> Result<&Region> {
        self.process(pid)?.lookup(name)
    }

    /// Occupied regions of `pid` in address order
    pub fn list_variables(&self, pid: Pid) -> Result<impl Iterator<Item = &Region> + '_> {
        Ok(self.process(pid)?.variables())
    }

    /// Every region of `pid`, free markers included, in address order
    pub fn list_regions(&self, pid: Pid) -> Result<impl Iterator<Item = &Region> + '_> {
        Ok(self.process(pid)?.regions())
    }

    /// Running processes in pid order
    pub fn list_processes(&self) -> impl Iterator<Item = Pid> + '_ {
        self.processes.keys().copied()
    }

    /// Usage summary of every running process
    pub fn process_infos(&self) -> impl Iterator<Item = ProcessInfo> + '_ {
        self.processes.values().map(|space| ProcessInfo {
            pid: space.pid(),
            used_bytes: space.used_bytes(),
            free_bytes: space.free_bytes(),
            mapped_pages: self.page_table.mapped_pages(space.pid()),
        })
    }

    /// Live page table entries ordered by pid, then page
    pub fn list_page_table(&self) -> impl Iterator<Item = PageMapping> + '_ {
        self.page_table.mappings()
    }

    /// Frames not backing any page
    pub fn free_frames(&self) -> usize {
        self.page_table.free_frames()
    }

    /// Writes `data` at virtual address `addr` of `pid`
    ///
    /// The run is split at page boundaries and every piece translated on its
    /// own, so it may span pages backed by unrelated frames. Every page is
    /// translated before the first byte is written.
    pub fn write_virtual(&mut self, pid: Pid, addr: VirtAddr, data: &[u8]) -> Result<()> {
        let pieces = self.split_translate(pid, addr, data.len())?;
        let mut written = 0;
        for (phys, len) in pieces {
            self.memory.write(phys, &data[written..written + len])?;
            written += len;
        }
        Ok(())
    }

    /// Reads `len` bytes at virtual address `addr` of `pid`
    pub fn read_virtual(&self, pid: Pid, addr: VirtAddr, len: Size) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(len);
        for (phys, piece) in self.split_translate(pid, addr, len)? {
            bytes.extend_from_slice(self.memory.read(phys, piece)?);
        }
        Ok(bytes)
    }

    /// Writes `data` into variable `name` starting `offset` bytes in
    pub fn write_variable(&mut self, pid: Pid, name: &str, offset: Size, data: &[u8]) -> Result<()> {
        let region = self.lookup(pid, name)?;
        let fits = offset
            .checked_add(data.len())
            .is_some_and(|end| end <= region.size());
        if !fits {
            return Err(invalid_argument("write runs past the end of the variable"));
        }
        let addr = region.address() + offset;
        self.write_virtual(pid, addr, data)
    }

    /// Reads the full contents of variable `name`
    pub fn read_variable(&self, pid: Pid, name: &str) -> Result<Vec<u8>> {
        let region = self.lookup(pid, name)?;
        self.read_virtual(pid, region.address(), region.size())
    }

    fn process(&self, pid: Pid) -> Result<&ProcessSpace> {
        self.processes.get(&pid).ok_or(Error::UnknownProcess(pid))
    }

    /// Translates `[addr, addr + len)` into per-page physical pieces
    fn split_translate(&self, pid: Pid, addr: VirtAddr, len: Size) -> Result<Vec<(PhysAddr, Size)>> {
        self.process(pid)?;
        let end = addr
            .checked_add(len)
            .ok_or(Error::UnmappedTranslation { pid, address: addr })?;

        let mut pieces = Vec::new();
        let mut cursor = addr;
        while cursor < end {
            let room = self.layout.page_size() - self.layout.page_offset(cursor);
            let piece = room.min(end - cursor);
            pieces.push((self.page_table.translate(pid, cursor)?, piece));
            cursor += piece;
        }
        Ok(pieces)
    }

    /// Tears down a process that never became visible to the caller
    fn discard(&mut self, pid: Pid) {
        self.processes.remove(&pid);
        self.page_table.remove_process(pid);
        log::debug!("pid {}: discarded after failed create", pid);
    }
}
