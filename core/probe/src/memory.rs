//! Total system memory, in KiB.

use std::fs;
use std::io;
use std::path::PathBuf;

use adeprecheck_common::Result;

/// Reads total system memory.
pub trait MemoryReader {
    /// Total memory in KiB.
    fn total_memory_kib(&self) -> Result<u64>;
}

/// Reads `MemTotal` from a meminfo file.
#[derive(Debug, Clone)]
pub struct ProcMeminfo {
    path: PathBuf,
}

impl ProcMeminfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcMeminfo {
    fn default() -> Self {
        Self::new("/proc/meminfo")
    }
}

impl MemoryReader for ProcMeminfo {
    fn total_memory_kib(&self) -> Result<u64> {
        let contents = fs::read_to_string(&self.path)?;
        parse_mem_total(&contents).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("no MemTotal entry in {}", self.path.display()),
            )
            .into()
        })
    }
}

/// Parse the `MemTotal:   16384256 kB` line.
fn parse_mem_total(contents: &str) -> Option<u64> {
    contents
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|value| value.parse().ok())
}
