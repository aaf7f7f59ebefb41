//! Command execution and listings

use serde::Serialize;
use vmsim_api::error::invalid_argument;
use vmsim_api::{PageMapping, ProcessInfo, RegionInfo, Result};
use vmsim_memory_management::Mmu;

use crate::command::{Command, PrintTarget};
use crate::value::Value;

/// Elements shown by `print <PID>:<var>` before the rest is summarized
const PREVIEW_ELEMENTS: usize = 4;

/// What the read loop should do after a command
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Exit,
}

#[derive(Serialize)]
struct ProcessSnapshot {
    #[serde(flatten)]
    info: ProcessInfo,
    regions: Vec<RegionInfo>,
}

#[derive(Serialize)]
struct Snapshot {
    page_size: usize,
    processes: Vec<ProcessSnapshot>,
    page_table: Vec<PageMapping>,
}

/// Interactive front end over one [`Mmu`]
pub struct Shell {
    mmu: Mmu,
}

impl Shell {
    pub fn new(mmu: Mmu) -> Self {
        Self { mmu }
    }

    /// Parses and runs one input line
    pub fn run_line(&mut self, line: &str) -> Result<Flow> {
        match Command::parse(line)? {
            Some(command) => self.execute(command),
            None => Ok(Flow::Continue(String::new())),
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Flow> {
        let output = match command {
            Command::Create { text_size, data_size } => {
                let pid = self.mmu.create(text_size, data_size)?;
                format!("{}\n", pid)
            }
            Command::Allocate { pid, name, data_type, count } => {
                let addr = self.mmu.allocate(pid, &name, data_type, count)?;
                format!("{}\n", addr)
            }
            Command::Set { pid, name, offset, values } => {
                self.set(pid, &name, offset, &values)?;
                String::new()
            }
            Command::Free { pid, name } => {
                self.mmu.release(pid, &name)?;
                String::new()
            }
            Command::Terminate { pid } => {
                self.mmu.terminate_process(pid)?;
                String::new()
            }
            Command::Print(target) => self.print(target)?,
            Command::Dump => self.dump()?,
            Command::Exit => return Ok(Flow::Exit),
        };
        Ok(Flow::Continue(output))
    }

    fn set(&mut self, pid: u32, name: &str, offset: usize, tokens: &[String]) -> Result<()> {
        let region = self.mmu.lookup(pid, name)?;
        let data_type = region
            .data_type()
            .ok_or_else(|| invalid_argument("cannot set a free region"))?;

        let mut bytes = Vec::with_capacity(tokens.len() * data_type.size());
        for token in tokens {
            bytes.extend(Value::parse(data_type, token)?.to_bytes());
        }
        let byte_offset = offset
            .checked_mul(data_type.size())
            .ok_or_else(|| invalid_argument("offset too large"))?;
        self.mmu.write_variable(pid, name, byte_offset, &bytes)
    }

    fn print(&self, target: PrintTarget) -> Result<String> {
        let mut out = String::new();
        match target {
            PrintTarget::Mmu => {
                out.push_str(" PID  | Variable Name | Virtual Addr | Size\n");
                out.push_str("------+---------------+--------------+------------\n");
                for pid in self.mmu.list_processes() {
                    for region in self.mmu.list_variables(pid)? {
                        out.push_str(&format!(
                            " {:<4} | {:<13} |   0x{:08X} | {:>10}\n",
                            pid,
                            region.name(),
                            region.address(),
                            region.size()
                        ));
                    }
                }
            }
            PrintTarget::PageTable => {
                out.push_str(" PID  | Page Number | Frame Number\n");
                out.push_str("------+-------------+--------------\n");
                for mapping in self.mmu.list_page_table() {
                    out.push_str(&format!(
                        " {:<4} | {:>11} | {:>12}\n",
                        mapping.pid, mapping.page, mapping.frame
                    ));
                }
            }
            PrintTarget::Processes => {
                for pid in self.mmu.list_processes() {
                    out.push_str(&format!("{}\n", pid));
                }
            }
            PrintTarget::Variable { pid, name } => {
                let region = self.mmu.lookup(pid, &name)?;
                let data_type = region
                    .data_type()
                    .ok_or_else(|| invalid_argument("cannot print a free region"))?;
                let bytes = self.mmu.read_variable(pid, &name)?;

                let count = bytes.len() / data_type.size();
                let mut shown = Vec::with_capacity(PREVIEW_ELEMENTS + 1);
                for chunk in bytes.chunks_exact(data_type.size()).take(PREVIEW_ELEMENTS) {
                    shown.push(Value::decode(data_type, chunk)?.to_string());
                }
                if count > PREVIEW_ELEMENTS {
                    shown.push(format!("... [{} items]", count));
                }
                out.push_str(&shown.join(", "));
                out.push('\n');
            }
        }
        Ok(out)
    }

    fn dump(&self) -> Result<String> {
        let processes = self
            .mmu
            .process_infos()
            .map(|info| -> Result<ProcessSnapshot> {
                let regions = self
                    .mmu
                    .list_regions(info.pid)?
                    .map(|region| region.info())
                    .collect();
                Ok(ProcessSnapshot { info, regions })
            })
            .collect::<Result<Vec<_>>>()?;

        let snapshot = Snapshot {
            page_size: self.mmu.layout().page_size(),
            processes,
            page_table: self.mmu.list_page_table().collect(),
        };
        serde_json::to_string_pretty(&snapshot)
            .map(|json| json + "\n")
            .map_err(|err| invalid_argument(&err.to_string()))
    }
}
