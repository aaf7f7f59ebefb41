//! First-fit free-list allocator over one process address space
//!
//! Occupied regions and free markers live in one list ordered by address
//! that always partitions `[0, bound)`. Region records sit in an arena and
//! the list is a sequence of arena indices, so splitting and merging are
//! edits of the index sequence; slots dropped by a merge are recycled.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::mem;
use core::ops::Range;

use hashbrown::HashMap;
use vmsim_api::error::invalid_argument;
use vmsim_api::{DataType, Error, PageNum, Pid, Result, Size, VirtAddr};

use crate::layout::MemoryLayout;
use crate::virtual_mem::{Region, FREE_SPACE_NAME};

/// Address space of one simulated process
pub struct ProcessSpace {
    pid: Pid,
    bound: Size,
    /// Region arena; only indices listed in `order` are live
    slots: Vec<Region>,
    vacant: Vec<usize>,
    /// Live arena indices in address order
    order: Vec<usize>,
    /// Occupied region name -> arena index
    names: HashMap<String, usize>,
}

impl ProcessSpace {
    /// Creates an address space holding a single free region `[0, bound)`
    pub fn new(pid: Pid, bound: Size) -> Self {
        Self {
            pid,
            bound,
            slots: vec![Region::free(0, bound)],
            vacant: Vec::new(),
            order: vec![0],
            names: HashMap::new(),
        }
    }

    /// Owning process
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Size of the address space
    pub fn bound(&self) -> Size {
        self.bound
    }

    /// All regions, free markers included, in address order
    pub fn regions(&self) -> impl Iterator<Item = &Region> + '_ {
        self.order.iter().map(move |&slot| &self.slots[slot])
    }

    /// Occupied regions in address order
    pub fn variables(&self) -> impl Iterator<Item = &Region> + '_ {
        self.regions().filter(|region| !region.is_free())
    }

    /// Finds an occupied region by name
    pub fn lookup(&self, name: &str) -> Result<&Region> {
        self.names
            .get(name)
            .map(|&slot| &self.slots[slot])
            .ok_or_else(|| Error::UnknownVariable(name.into()))
    }

    /// Address a reservation of `size` bytes would receive, without reserving
    pub fn first_fit(&self, size: Size) -> Option<VirtAddr> {
        self.find_fit(size)
            .map(|position| self.slots[self.order[position]].address())
    }

    /// Reserves `size` bytes for a new variable in the first free region
    /// large enough to hold it
    ///
    /// The variable takes the start of that region and the remainder stays
    /// behind it as a smaller free marker. On error nothing changes.
    pub fn reserve(&mut self, name: &str, size: Size, data_type: DataType) -> Result<VirtAddr> {
        if size == 0 {
            return Err(invalid_argument("region size must be non-zero"));
        }
        if name == FREE_SPACE_NAME {
            return Err(invalid_argument("the free-space tag cannot name a variable"));
        }
        if self.names.contains_key(name) {
            return Err(Error::DuplicateVariable(name.into()));
        }

        let Some(position) = self.find_fit(size) else {
            log::warn!(
                "pid {}: no free region holds {} bytes (largest is {})",
                self.pid,
                size,
                self.largest_free()
            );
            return Err(Error::AllocationExceedsCapacity(size));
        };

        let free_slot = self.order[position];
        let address = self.slots[free_slot].address();
        let variable = Region::occupied(name, address, size, data_type);

        let slot = if self.slots[free_slot].size() == size {
            self.slots[free_slot] = variable;
            free_slot
        } else {
            self.slots[free_slot].shrink_front(size);
            let slot = self.alloc_slot(variable);
            self.order.insert(position, slot);
            slot
        };
        self.names.insert(name.into(), slot);

        log::debug!(
            "pid {}: reserved {} ({} bytes) at {:#x}",
            self.pid,
            name,
            size,
            address
        );
        Ok(address)
    }

    /// Turns the named variable back into free space and merges it with any
    /// free neighbours
    ///
    /// Returns the byte range the variable occupied.
    pub fn release(&mut self, name: &str) -> Result<Range<VirtAddr>> {
        let slot = self
            .names
            .remove(name)
            .ok_or_else(|| Error::UnknownVariable(name.into()))?;

        let region = &mut self.slots[slot];
        let released = region.address()..region.end();
        region.mark_free();
        self.coalesce();

        log::debug!(
            "pid {}: released {} [{:#x}, {:#x})",
            self.pid,
            name,
            released.start,
            released.end
        );
        Ok(released)
    }

    /// Returns true if any occupied region shares a byte with `page`
    pub fn page_occupied(&self, page: PageNum, layout: &MemoryLayout) -> bool {
        let start = layout.page_base(page);
        let end = start + layout.page_size();
        let first = self
            .order
            .partition_point(|&slot| self.slots[slot].end() <= start);

        self.order[first..]
            .iter()
            .map(|&slot| &self.slots[slot])
            .take_while(|region| region.address() < end)
            .any(|region| !region.is_free())
    }

    /// Bytes held by occupied regions
    pub fn used_bytes(&self) -> Size {
        self.variables().map(Region::size).sum()
    }

    /// Bytes held by free markers
    pub fn free_bytes(&self) -> Size {
        self.bound - self.used_bytes()
    }

    /// Size of the largest free region
    pub fn largest_free(&self) -> Size {
        self.regions()
            .filter(|region| region.is_free())
            .map(Region::size)
            .max()
            .unwrap_or(0)
    }

    /// Checks that the regions tile `[0, bound)` in order, that no two free
    /// markers are adjacent and that the name index matches the list
    pub fn is_partitioned(&self) -> bool {
        let mut expected = 0;
        let mut previous_free = false;
        for region in self.regions() {
            if region.address() != expected || region.size() == 0 {
                return false;
            }
            if region.is_free() && previous_free {
                return false;
            }
            previous_free = region.is_free();
            expected = region.end();
        }

        let indexed = self
            .names
            .iter()
            .all(|(name, &slot)| self.order.contains(&slot) && self.slots[slot].name() == name.as_str());
        expected == self.bound() && indexed && self.names.len() == self.variables().count()
    }

    fn find_fit(&self, size: Size) -> Option<usize> {
        self.order.iter().position(|&slot| {
            let region = &self.slots[slot];
            region.is_free() && region.size() >= size
        })
    }

    fn alloc_slot(&mut self, region: Region) -> usize {
        match self.vacant.pop() {
            Some(slot) => {
                self.slots[slot] = region;
                slot
            }
            None => {
                self.slots.push(region);
                self.slots.len() - 1
            }
        }
    }

    /// Merges every run of consecutive free markers into its first member
    fn coalesce(&mut self) {
        let order = mem::take(&mut self.order);
        let mut merged: Vec<usize> = Vec::with_capacity(order.len());

        for slot in order {
            if let Some(&last) = merged.last() {
                if self.slots[last].is_free() && self.slots[slot].is_free() {
                    let size = self.slots[slot].size();
                    self.slots[last].grow(size);
                    self.vacant.push(slot);
                    continue;
                }
            }
            merged.push(slot);
        }

        self.order = merged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(space: &ProcessSpace) -> Vec<(VirtAddr, Size, bool)> {
        space
            .regions()
            .map(|region| (region.address(), region.size(), region.is_free()))
            .collect()
    }

    #[test]
    fn test_new_space_is_one_free_region() {
        let space = ProcessSpace::new(1024, 4096);
        assert_eq!(space.bound(), 4096);
        assert_eq!(spans(&space), vec![(0, 4096, true)]);
        assert!(space.is_partitioned());
    }

    #[test]
    fn test_reserve_splits_first_free_region() {
        let mut space = ProcessSpace::new(1024, 1000);
        assert_eq!(space.reserve("a", 100, DataType::Char), Ok(0));
        assert_eq!(space.reserve("b", 100, DataType::Char), Ok(100));
        assert_eq!(
            spans(&space),
            vec![(0, 100, false), (100, 100, false), (200, 800, true)]
        );
        assert!(space.is_partitioned());
    }

    #[test]
    fn test_first_fit_reuses_freed_hole() {
        let mut space = ProcessSpace::new(1024, 1000);
        space.reserve("a", 100, DataType::Char).unwrap();
        space.reserve("b", 100, DataType::Char).unwrap();
        assert_eq!(space.release("a"), Ok(0..100));
        assert_eq!(space.first_fit(50), Some(0));
        assert_eq!(space.reserve("c", 50, DataType::Char), Ok(0));
        assert_eq!(
            spans(&space),
            vec![(0, 50, false), (50, 50, true), (100, 100, false), (200, 800, true)]
        );
    }

    #[test]
    fn test_first_fit_skips_small_holes() {
        let mut space = ProcessSpace::new(1024, 1000);
        space.reserve("a", 100, DataType::Char).unwrap();
        space.reserve("b", 100, DataType::Char).unwrap();
        space.release("a").unwrap();
        assert_eq!(space.reserve("c", 150, DataType::Char), Ok(200));
    }

    #[test]
    fn test_exact_fit_drops_free_marker() {
        let mut space = ProcessSpace::new(1024, 300);
        space.reserve("a", 100, DataType::Char).unwrap();
        space.reserve("b", 200, DataType::Char).unwrap();
        assert_eq!(spans(&space), vec![(0, 100, false), (100, 200, false)]);
        assert!(space.is_partitioned());
    }

    #[test]
    fn test_failed_reserve_changes_nothing() {
        let mut space = ProcessSpace::new(1024, 300);
        space.reserve("a", 200, DataType::Char).unwrap();
        let before = spans(&space);
        assert_eq!(
            space.reserve("b", 101, DataType::Char),
            Err(Error::AllocationExceedsCapacity(101))
        );
        assert_eq!(spans(&space), before);
        assert!(space.lookup("b").is_err());
    }

    #[test]
    fn test_reserve_rejects_bad_requests() {
        let mut space = ProcessSpace::new(1024, 300);
        space.reserve("a", 10, DataType::Int).unwrap();
        assert_eq!(
            space.reserve("a", 10, DataType::Int),
            Err(Error::DuplicateVariable("a".into()))
        );
        assert!(matches!(
            space.reserve("z", 0, DataType::Int),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            space.reserve(FREE_SPACE_NAME, 4, DataType::Int),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_release_coalesces_both_sides() {
        let mut space = ProcessSpace::new(1024, 120);
        space.reserve("a", 50, DataType::Char).unwrap();
        space.reserve("b", 70, DataType::Char).unwrap();
        space.release("a").unwrap();
        space.release("b").unwrap();
        assert_eq!(spans(&space), vec![(0, 120, true)]);

        let mut space = ProcessSpace::new(1024, 300);
        for name in ["a", "b", "c"] {
            space.reserve(name, 100, DataType::Char).unwrap();
        }
        space.release("a").unwrap();
        space.release("c").unwrap();
        assert_eq!(
            spans(&space),
            vec![(0, 100, true), (100, 100, false), (200, 100, true)]
        );
        space.release("b").unwrap();
        assert_eq!(spans(&space), vec![(0, 300, true)]);
        assert!(space.is_partitioned());
    }

    #[test]
    fn test_release_unknown_variable() {
        let mut space = ProcessSpace::new(1024, 300);
        assert_eq!(space.release("ghost"), Err(Error::UnknownVariable("ghost".into())));
        space.reserve("a", 10, DataType::Char).unwrap();
        space.release("a").unwrap();
        assert!(space.release("a").is_err());
    }

    #[test]
    fn test_slots_are_recycled() {
        let mut space = ProcessSpace::new(1024, 1000);
        for round in 0..10 {
            space.reserve("a", 100, DataType::Char).unwrap();
            space.reserve("b", 100, DataType::Char).unwrap();
            space.release("a").unwrap();
            space.release("b").unwrap();
            assert!(space.slots.len() <= 3, "round {}", round);
        }
    }

    #[test]
    fn test_page_occupied() {
        let layout = MemoryLayout::with_memory_size(1024, 8192).unwrap();
        let mut space = ProcessSpace::new(1024, 8192);
        space.reserve("a", 1000, DataType::Char).unwrap();
        space.reserve("b", 100, DataType::Char).unwrap();
        space.reserve("c", 1900, DataType::Char).unwrap();
        space.release("b").unwrap();
        // page 0 still holds `a`, page 1 holds the tail of the hole and `c`
        assert!(space.page_occupied(0, &layout));
        assert!(space.page_occupied(1, &layout));
        assert!(space.page_occupied(2, &layout));
        assert!(!space.page_occupied(3, &layout));
        space.release("a").unwrap();
        assert!(!space.page_occupied(0, &layout));
    }

    #[test]
    fn test_usage_accounting() {
        let mut space = ProcessSpace::new(1024, 1000);
        space.reserve("a", 100, DataType::Char).unwrap();
        space.reserve("b", 300, DataType::Char).unwrap();
        space.release("a").unwrap();
        assert_eq!(space.used_bytes(), 300);
        assert_eq!(space.free_bytes(), 700);
        assert_eq!(space.largest_free(), 600);
        assert_eq!(space.variables().count(), 1);
    }
}
