//! VMSIM Memory Management
//!
//! This crate simulates per-process virtual address spaces on top of a flat
//! simulated RAM. It includes the first-fit region allocator, the frame
//! allocator, the global page table and the [`Mmu`] facade tying them
//! together.
//!
//! ```rust
//! use vmsim_api::DataType;
//! use vmsim_memory_management::{MemoryLayout, Mmu};
//!
//! let mut mmu = Mmu::new(MemoryLayout::new(1024).unwrap());
//! let pid = mmu.create_process();
//! let addr = mmu.reserve(pid, "<TEXT>", 2048, DataType::Char).unwrap();
//! assert_eq!(addr, 0);
//! assert_eq!(mmu.translate(pid, 1500).unwrap(), 1500);
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

// Re-export API types
pub use vmsim_api::{
    AddressTranslator, DataType, Error, FrameAllocator, FrameNum, PageMapping, PageNum, PhysAddr,
    Pid, ProcessInfo, RegionInfo, Result, Size, VirtAddr,
};

// Memory management modules
pub mod allocator;
pub mod layout;
pub mod mmu;
pub mod page_table;
pub mod physical;
pub mod virtual_mem;

// Re-export commonly used types
pub use allocator::bitmap::BitmapFrameAllocator;
pub use allocator::first_fit::ProcessSpace;
pub use layout::{MemoryLayout, DEFAULT_MEMORY_SIZE, DEFAULT_STACK_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
pub use mmu::{Mmu, FIRST_PID};
pub use page_table::PageTable;
pub use physical::PhysicalMemory;
pub use virtual_mem::{Region, FREE_SPACE_NAME, GLOBALS_SEGMENT, STACK_SEGMENT, TEXT_SEGMENT};
