//! Read-only listing records
//!
//! These are the values handed to front ends for `print`-style dumps. They
//! are detached copies; holding one never borrows simulator state.

use alloc::string::String;

use crate::core::types::{DataType, FrameNum, PageNum, Pid, Size, VirtAddr};

/// One region of a process address space
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RegionInfo {
    /// Variable name, or the free-marker tag
    pub name: String,
    /// Start virtual address
    pub address: VirtAddr,
    /// Size in bytes
    pub size: Size,
    /// Element type, `None` for free space
    pub data_type: Option<DataType>,
}

impl RegionInfo {
    /// Returns true if the region is a free marker
    pub fn is_free(&self) -> bool {
        self.data_type.is_none()
    }

    /// Number of elements the region holds
    pub fn element_count(&self) -> usize {
        self.data_type.map_or(0, |ty| self.size / ty.size())
    }
}

/// One live page table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PageMapping {
    /// Owning process
    pub pid: Pid,
    /// Virtual page number
    pub page: PageNum,
    /// Physical frame number
    pub frame: FrameNum,
}

/// Summary of one running process
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProcessInfo {
    /// Process identifier
    pub pid: Pid,
    /// Bytes held by occupied regions
    pub used_bytes: Size,
    /// Bytes held by free markers
    pub free_bytes: Size,
    /// Number of pages mapped for the process
    pub mapped_pages: usize,
}
