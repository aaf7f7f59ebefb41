//! memsim - interactive front end for the memory allocation simulator
//!
//! ```text
//! memsim <page_size>
//! ```
//!
//! Reads one command per line from stdin until `exit` or end of input.
//! Diagnostics go to stderr at the level named by `VMSIM_LOG`.

mod command;
mod logger;
mod shell;
mod value;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use vmsim_memory_management::{MemoryLayout, Mmu};

use crate::shell::{Flow, Shell};

fn main() -> Result<()> {
    logger::init(logger::parse_level(std::env::var(logger::LOG_ENV).ok().as_deref()))
        .context("failed to install logger")?;

    let page_size = std::env::args()
        .nth(1)
        .context("you must specify the page size")?;
    let page_size: usize = page_size
        .parse()
        .with_context(|| format!("invalid page size '{}'", page_size))?;
    let layout = MemoryLayout::new(page_size)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_banner(&mut out, page_size)?;

    let mut shell = Shell::new(Mmu::new(layout));
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        match shell.run_line(&line?) {
            Ok(Flow::Continue(output)) => out.write_all(output.as_bytes())?,
            Ok(Flow::Exit) => break,
            Err(err) => writeln!(out, "error: {}", err)?,
        }
    }
    Ok(())
}

fn print_banner(out: &mut impl Write, page_size: usize) -> io::Result<()> {
    writeln!(
        out,
        "Welcome to the Memory Allocation Simulator! Using a page size of {} bytes.",
        page_size
    )?;
    writeln!(out, "Commands:")?;
    writeln!(out, "  * create <text_size> <data_size> (initializes a new process)")?;
    writeln!(
        out,
        "  * allocate <PID> <var_name> <data_type> <number_of_elements> (allocated memory on the heap)"
    )?;
    writeln!(
        out,
        "  * set <PID> <var_name> <offset> <value_0> <value_1> <value_2> ... <value_N> (set the value for a variable)"
    )?;
    writeln!(
        out,
        "  * free <PID> <var_name> (deallocate memory on the heap that is associated with <var_name>)"
    )?;
    writeln!(out, "  * terminate <PID> (kill the specified process)")?;
    writeln!(out, "  * print <object> (prints data)")?;
    writeln!(out, "    * If <object> is \"mmu\", print the MMU memory table")?;
    writeln!(out, "    * if <object> is \"page\", print the page table")?;
    writeln!(
        out,
        "    * if <object> is \"processes\", print a list of PIDs for processes that are still running"
    )?;
    writeln!(
        out,
        "    * if <object> is a \"<PID>:<var_name>\", print the value of the variable for that process"
    )?;
    writeln!(out, "  * dump (print a JSON snapshot of every process and the page table)")?;
    writeln!(out, "  * exit (quit the simulator)")?;
    writeln!(out)
}
