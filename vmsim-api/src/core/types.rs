//! Core types used throughout the simulator

use ::core::fmt;
use ::core::str::FromStr;

use crate::error::Error;

/// Process identifier type
pub type Pid = u32;

/// Physical address type (byte offset into simulated RAM)
pub type PhysAddr = usize;

/// Virtual address type (byte offset into a process address space)
pub type VirtAddr = usize;

/// Virtual page number type
pub type PageNum = usize;

/// Physical frame number type
pub type FrameNum = usize;

/// Size type
pub type Size = usize;

/// Element type of a variable.
///
/// The type only decides how many bytes one element occupies; the
/// allocator and page table never look at it beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DataType {
    /// 1 byte
    Char,
    /// 2 bytes
    Short,
    /// 4 bytes
    Int,
    /// 4 bytes
    Float,
    /// 8 bytes
    Long,
    /// 8 bytes
    Double,
}

impl DataType {
    /// Every supported type, narrowest first.
    pub const ALL: [DataType; 6] = [
        DataType::Char,
        DataType::Short,
        DataType::Int,
        DataType::Float,
        DataType::Long,
        DataType::Double,
    ];

    /// Width of a single element in bytes
    pub const fn size(self) -> Size {
        match self {
            DataType::Char => 1,
            DataType::Short => 2,
            DataType::Int | DataType::Float => 4,
            DataType::Long | DataType::Double => 8,
        }
    }

    /// Keyword used on the command line and in listings
    pub const fn name(self) -> &'static str {
        match self {
            DataType::Char => "char",
            DataType::Short => "short",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Long => "long",
            DataType::Double => "double",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .iter()
            .copied()
            .find(|ty| ty.name() == s)
            .ok_or_else(|| Error::InvalidType(s.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_table() {
        let widths: Vec<Size> = DataType::ALL.iter().map(|ty| ty.size()).collect();
        assert_eq!(widths, vec![1, 2, 4, 4, 8, 8]);
    }

    #[test]
    fn test_parse_keywords() {
        for ty in DataType::ALL {
            assert_eq!(ty.name().parse::<DataType>().unwrap(), ty);
        }
        assert!(matches!("Int".parse::<DataType>(), Err(Error::InvalidType(_))));
        assert!(matches!("".parse::<DataType>(), Err(Error::InvalidType(_))));
    }
}
