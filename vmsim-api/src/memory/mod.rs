//! Memory management module

pub mod interface;
pub mod types;

// Re-export commonly used items
pub use interface::*;
pub use types::{PageMapping, ProcessInfo, RegionInfo};
