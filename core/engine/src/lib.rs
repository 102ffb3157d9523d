//! Precheck engine gating disk encryption operations.
//!
//! This module provides:
//! - Engine configuration ([`PrecheckConfig`])
//! - Volume-type, Key Vault and system-layout validation ([`ConfigValidator`])
//! - The fail-fast entry point run before the encryption engine ([`PrecheckOrchestrator`])
//!
//! # Architecture
//! Settings and platform facts flow one way: pure decisions first
//! (volume types, Key Vault references, support matrix), then single-read
//! probes of live state. A clean return from
//! [`PrecheckOrchestrator::precheck_for_fatal_failures`] is the only
//! authorization for the encryption engine to proceed.

pub mod config;
pub mod orchestrator;
pub mod validator;

pub use config::PrecheckConfig;
pub use orchestrator::{Check, PrecheckOrchestrator, PrecheckWarning};
pub use validator::{ConfigValidator, Probes};
