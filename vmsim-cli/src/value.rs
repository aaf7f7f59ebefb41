//! Typed element values for `set` and `print <PID>:<var>`

use std::fmt;

use vmsim_api::error::invalid_argument;
use vmsim_api::{DataType, Result};

/// One element of a variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Char(u8),
    Short(i16),
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
}

impl Value {
    /// Parses a command-line token as an element of `data_type`
    pub fn parse(data_type: DataType, token: &str) -> Result<Self> {
        let bad = || invalid_argument(&format!("'{}' is not a valid {}", token, data_type));
        let value = match data_type {
            DataType::Char => match token.as_bytes() {
                [byte] if byte.is_ascii() => Value::Char(*byte),
                _ => return Err(bad()),
            },
            DataType::Short => Value::Short(token.parse().map_err(|_| bad())?),
            DataType::Int => Value::Int(token.parse().map_err(|_| bad())?),
            DataType::Float => Value::Float(token.parse().map_err(|_| bad())?),
            DataType::Long => Value::Long(token.parse().map_err(|_| bad())?),
            DataType::Double => Value::Double(token.parse().map_err(|_| bad())?),
        };
        Ok(value)
    }

    /// Decodes one little-endian element; `bytes` must be exactly one
    /// element wide
    pub fn decode(data_type: DataType, bytes: &[u8]) -> Result<Self> {
        let wrong_width = || invalid_argument("element width does not match its type");
        let value = match data_type {
            DataType::Char => Value::Char(*bytes.first().ok_or_else(wrong_width)?),
            DataType::Short => {
                Value::Short(i16::from_le_bytes(bytes.try_into().map_err(|_| wrong_width())?))
            }
            DataType::Int => {
                Value::Int(i32::from_le_bytes(bytes.try_into().map_err(|_| wrong_width())?))
            }
            DataType::Float => {
                Value::Float(f32::from_le_bytes(bytes.try_into().map_err(|_| wrong_width())?))
            }
            DataType::Long => {
                Value::Long(i64::from_le_bytes(bytes.try_into().map_err(|_| wrong_width())?))
            }
            DataType::Double => {
                Value::Double(f64::from_le_bytes(bytes.try_into().map_err(|_| wrong_width())?))
            }
        };
        Ok(value)
    }

    /// Little-endian encoding
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            Value::Char(v) => vec![v],
            Value::Short(v) => v.to_le_bytes().to_vec(),
            Value::Int(v) => v.to_le_bytes().to_vec(),
            Value::Float(v) => v.to_le_bytes().to_vec(),
            Value::Long(v) => v.to_le_bytes().to_vec(),
            Value::Double(v) => v.to_le_bytes().to_vec(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Char(v) => write!(f, "{}", *v as char),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
        }
    }
}
