//! VMSIM API - Core interfaces and types for the memory simulator
//!
//! This crate provides the types and abstractions shared by the simulator
//! crates. The memory management crate implements the interfaces declared
//! here, and front ends only ever talk in these types.
//!
//! # Architecture
//!
//! - **Core**: address and identifier aliases, the closed [`DataType`] set
//! - **Error**: the [`Error`] enum and [`Result`] alias
//! - **Memory**: frame allocation / translation traits and listing records
//!
//! # Usage
//!
//! ```rust
//! use vmsim_api::{DataType, Result};
//!
//! fn bytes_for(ty: &str, count: usize) -> Result<usize> {
//!     let ty: DataType = ty.parse()?;
//!     Ok(ty.size() * count)
//! }
//!
//! assert_eq!(bytes_for("double", 3).unwrap(), 24);
//! assert!(bytes_for("quad", 1).is_err());
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod core;
pub mod error;
pub mod memory;

// Re-export commonly used types
pub use crate::core::types::*;
pub use crate::error::{Error, Result};
pub use crate::memory::interface::{AddressTranslator, FrameAllocator};
pub use crate::memory::types::{PageMapping, ProcessInfo, RegionInfo};
