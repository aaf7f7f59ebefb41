//! Memory allocator module
//!
//! - [`first_fit`]: per-process virtual address allocator
//! - [`bitmap`]: shared physical frame allocator

pub mod bitmap;
pub mod first_fit;
