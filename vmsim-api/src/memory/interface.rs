//! Memory management interface

use crate::error::Result;
use crate::core::types::{FrameNum, PhysAddr, Pid, VirtAddr};

/// Trait for a physical frame allocator
///
/// Frames come from a single pool shared by every process. A frame handed
/// out by [`alloc_frame`](FrameAllocator::alloc_frame) stays owned until it
/// is passed back to [`free_frame`](FrameAllocator::free_frame).
pub trait FrameAllocator {
    /// Allocates the lowest-numbered free frame
    fn alloc_frame(&mut self) -> Result<FrameNum>;

    /// Returns a frame to the pool
    fn free_frame(&mut self, frame: FrameNum) -> Result<()>;

    /// Returns true if the frame is currently handed out
    fn is_allocated(&self, frame: FrameNum) -> bool;

    /// Returns number of free frames
    fn free_frames(&self) -> usize;

    /// Returns total number of frames
    fn total_frames(&self) -> usize;
}

/// Trait for virtual to physical address translation
pub trait AddressTranslator {
    /// Returns the physical address backing `addr` in process `pid`
    fn translate(&self, pid: Pid, addr: VirtAddr) -> Result<PhysAddr>;
}
