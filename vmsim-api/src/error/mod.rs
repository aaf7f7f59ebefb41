//! Error handling module for the memory simulator
//!
//! Every failure is local: an operation that returns an [`Error`] has not
//! touched the process table, the page table or physical memory.

use ::core::fmt;
use alloc::string::String;

use crate::core::types::{PhysAddr, Pid, Size, VirtAddr};

/// Common error type used throughout the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No free region is large enough for the requested size
    AllocationExceedsCapacity(Size),
    /// No process with this pid exists
    UnknownProcess(Pid),
    /// No variable with this name exists in the process
    UnknownVariable(String),
    /// A variable with this name already exists in the process
    DuplicateVariable(String),
    /// Unrecognized data type keyword
    InvalidType(String),
    /// The virtual address has no page table entry
    UnmappedTranslation {
        /// Owning process
        pid: Pid,
        /// Address that failed to translate
        address: VirtAddr,
    },
    /// Every physical frame is in use
    OutOfFrames,
    /// Access past the end of simulated RAM
    PhysicalOutOfBounds(PhysAddr),
    /// Invalid argument
    InvalidArgument(String),
    /// Configuration error
    InvalidConfig(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AllocationExceedsCapacity(size) => {
                write!(f, "allocation of {} bytes exceeds available space", size)
            }
            Error::UnknownProcess(pid) => write!(f, "process {} not found", pid),
            Error::UnknownVariable(name) => write!(f, "variable {} not found", name),
            Error::DuplicateVariable(name) => write!(f, "variable {} already exists", name),
            Error::InvalidType(ty) => write!(f, "invalid data type: {}", ty),
            Error::UnmappedTranslation { pid, address } => {
                write!(f, "address {:#010x} of process {} is not mapped", address, pid)
            }
            Error::OutOfFrames => write!(f, "out of physical frames"),
            Error::PhysicalOutOfBounds(addr) => {
                write!(f, "physical address {:#x} is outside memory", addr)
            }
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type for operations that can fail
pub type Result<T> = ::core::result::Result<T, Error>;

/// Creates a new invalid argument error
pub fn invalid_argument(msg: &str) -> Error {
    Error::InvalidArgument(msg.into())
}

/// Creates a new configuration error
pub fn invalid_config(msg: &str) -> Error {
    Error::InvalidConfig(msg.into())
}
