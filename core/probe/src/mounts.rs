//! Live mount table.

use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use adeprecheck_common::Result;

/// One row of the mount table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub options: Vec<String>,
}

impl MountEntry {
    pub fn new(
        device: impl Into<String>,
        mount_point: impl Into<String>,
        fs_type: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            mount_point: mount_point.into(),
            fs_type: fs_type.into(),
            options: Vec::new(),
        }
    }

    /// Backed by a block device rather than a pseudo filesystem.
    pub fn is_block_device(&self) -> bool {
        self.device.starts_with("/dev/")
    }
}

/// Returns the current mounts in table order.
pub trait MountTable {
    fn mounts(&self) -> Result<Vec<MountEntry>>;
}

/// Reads a `/proc/mounts`-formatted file.
#[derive(Debug, Clone)]
pub struct ProcMounts {
    path: PathBuf,
}

impl ProcMounts {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcMounts {
    fn default() -> Self {
        Self::new("/proc/mounts")
    }
}

impl MountTable for ProcMounts {
    fn mounts(&self) -> Result<Vec<MountEntry>> {
        let contents = fs::read_to_string(&self.path)?;
        let entries = parse_mounts(&contents);
        debug!(path = %self.path.display(), count = entries.len(), "read mount table");
        Ok(entries)
    }
}

/// Parse mount table text, skipping blank and truncated lines.
pub fn parse_mounts(contents: &str) -> Vec<MountEntry> {
    contents
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let device = parts.next()?;
            let mount_point = parts.next()?;
            let fs_type = parts.next()?;
            let options = parts
                .next()
                .map(|o| o.split(',').map(String::from).collect())
                .unwrap_or_default();
            Some(MountEntry {
                device: unescape_mount_field(device),
                mount_point: unescape_mount_field(mount_point),
                fs_type: fs_type.to_string(),
                options,
            })
        })
        .collect()
}

/// Decode the `\040`-style octal escapes the kernel uses for whitespace.
fn unescape_mount_field(input: &str) -> String {
    let mut chars = input.chars().peekable();
    let mut output = String::with_capacity(input.len());

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        let mut oct = String::new();
        while oct.len() < 3 {
            match chars.peek() {
                Some(next) if next.is_digit(8) => {
                    oct.push(*next);
                    chars.next();
                }
                _ => break,
            }
        }
        match u8::from_str_radix(&oct, 8) {
            Ok(value) if oct.len() == 3 => output.push(value as char),
            _ => {
                output.push('\\');
                output.push_str(&oct);
            }
        }
    }

    output
}
