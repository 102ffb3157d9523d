//! Distro, kernel and memory compatibility decisions.
//!
//! The support tables are static, range-keyed and auditable on their own;
//! every decision is a pure function of its inputs plus at most one memory
//! read.

pub mod matrix;
pub mod memory;
pub mod version;

pub use matrix::{CompatibilityMatrix, OnlineEncryptionRelease, SupportedRelease};
pub use memory::{MemoryGate, MIN_MEMORY_KIB};
pub use version::Version;
