//! Collaborators that read live system state.
//!
//! Every probe sits behind a narrow trait so validation logic can run
//! against scripted fakes (see [`fake`]) instead of a real operating system.

pub mod appcompat;
pub mod command;
pub mod fake;
pub mod memory;
pub mod mounts;

pub use appcompat::{AppCompatMarker, AppCompatScanner};
pub use command::{CommandOutcome, CommandRunner, SystemCommandRunner};
pub use memory::{MemoryReader, ProcMeminfo};
pub use mounts::{MountEntry, MountTable, ProcMounts};
