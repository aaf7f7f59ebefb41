//! Command line tokenizing and validation

use std::str::FromStr;

use vmsim_api::error::invalid_argument;
use vmsim_api::{DataType, Pid, Result, Size};

/// Target of a `print` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintTarget {
    Mmu,
    PageTable,
    Processes,
    Variable { pid: Pid, name: String },
}

/// A parsed shell command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create { text_size: Size, data_size: Size },
    Allocate { pid: Pid, name: String, data_type: DataType, count: usize },
    Set { pid: Pid, name: String, offset: usize, values: Vec<String> },
    Free { pid: Pid, name: String },
    Terminate { pid: Pid },
    Print(PrintTarget),
    Dump,
    Exit,
}

impl Command {
    /// Parses one input line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&keyword, args)) = tokens.split_first() else {
            return Ok(None);
        };

        let command = match (keyword, args) {
            ("create", [text, data]) => Command::Create {
                text_size: number(text, "text size")?,
                data_size: number(data, "data size")?,
            },
            ("allocate", [pid, name, ty, count]) => Command::Allocate {
                pid: number(pid, "PID")?,
                name: name.to_string(),
                data_type: ty.parse()?,
                count: number(count, "number of elements")?,
            },
            ("set", [pid, name, offset, values @ ..]) if !values.is_empty() => Command::Set {
                pid: number(pid, "PID")?,
                name: name.to_string(),
                offset: number(offset, "offset")?,
                values: values.iter().map(|v| v.to_string()).collect(),
            },
            ("free", [pid, name]) => Command::Free {
                pid: number(pid, "PID")?,
                name: name.to_string(),
            },
            ("terminate", [pid]) => Command::Terminate {
                pid: number(pid, "PID")?,
            },
            ("print", [target]) => Command::Print(print_target(target)?),
            ("dump", []) => Command::Dump,
            ("exit", []) => Command::Exit,
            (
                "create" | "allocate" | "set" | "free" | "terminate" | "print" | "dump" | "exit",
                _,
            ) => {
                return Err(invalid_argument(&format!(
                    "wrong number of arguments for '{}'",
                    keyword
                )));
            }
            _ => return Err(invalid_argument(&format!("unknown command '{}'", keyword))),
        };
        Ok(Some(command))
    }
}

fn print_target(target: &str) -> Result<PrintTarget> {
    match target {
        "mmu" => Ok(PrintTarget::Mmu),
        "page" => Ok(PrintTarget::PageTable),
        "processes" => Ok(PrintTarget::Processes),
        _ => {
            let (pid, name) = target
                .split_once(':')
                .filter(|(_, name)| !name.is_empty())
                .ok_or_else(|| invalid_argument(&format!("unknown print target '{}'", target)))?;
            Ok(PrintTarget::Variable {
                pid: number(pid, "PID")?,
                name: name.to_string(),
            })
        }
    }
}

fn number<T: FromStr>(token: &str, what: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| invalid_argument(&format!("{} must be a non-negative integer, got '{}'", what, token)))
}
