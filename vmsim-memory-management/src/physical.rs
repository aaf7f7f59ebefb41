//! Physical memory module
//!
//! Simulated RAM is one flat byte buffer. Frame `n` occupies bytes
//! `n * page_size .. (n + 1) * page_size`. Accesses here are contiguous and
//! type-agnostic; splitting a virtual run at page boundaries is the job of
//! the caller that translated it.

use alloc::vec;
use alloc::vec::Vec;

use vmsim_api::{Error, PhysAddr, Result, Size};

/// Fixed-size simulated RAM
pub struct PhysicalMemory {
    bytes: Vec<u8>,
}

impl PhysicalMemory {
    /// Creates a zero-filled memory of `size` bytes
    pub fn new(size: Size) -> Self {
        Self { bytes: vec![0; size] }
    }

    /// Total size in bytes
    pub fn size(&self) -> Size {
        self.bytes.len()
    }

    /// Copies `data` into memory starting at `addr`
    ///
    /// # Errors
    /// Returns [`Error::PhysicalOutOfBounds`] if any byte of the run falls
    /// outside memory; nothing is written in that case.
    pub fn write(&mut self, addr: PhysAddr, data: &[u8]) -> Result<()> {
        let range = self.checked_range(addr, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Reads `len` bytes starting at `addr`
    pub fn read(&self, addr: PhysAddr, len: Size) -> Result<&[u8]> {
        let range = self.checked_range(addr, len)?;
        Ok(&self.bytes[range])
    }

    /// Zero-fills `len` bytes starting at `addr`
    pub fn clear(&mut self, addr: PhysAddr, len: Size) -> Result<()> {
        let range = self.checked_range(addr, len)?;
        self.bytes[range].fill(0);
        Ok(())
    }

    fn checked_range(&self, addr: PhysAddr, len: Size) -> Result<core::ops::Range<usize>> {
        match addr.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(addr..end),
            _ => Err(Error::PhysicalOutOfBounds(addr)),
        }
    }
}
