//! Common types shared across the precheck crates.
//!
//! This module provides the failure taxonomy and the transient value types
//! that flow from the caller into every validation step.

pub mod error;
pub mod settings;
pub mod types;

pub use error::{Error, Result};
pub use settings::{keys, Settings};
pub use types::{
    DistroFacts, EncryptionStatus, OperationKind, VmTopology, VolumeStatus, VolumeType,
};
