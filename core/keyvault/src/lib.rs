//! Structural validation of Key Vault references.
//!
//! This module provides:
//! - Parsing of Key Vault resource IDs, vault URLs and key-encryption-key URLs
//! - Cross-checks that a resource ID and a URL name the same vault
//! - Key-encryption algorithm validation
//!
//! No network access is ever made; every reference is validated as a string.

pub mod endpoint;
pub mod resource_id;
pub mod validator;

pub use endpoint::{KekUrl, VaultUrl, DEFAULT_DNS_SUFFIXES};
pub use resource_id::VaultIdentifier;
pub use validator::{IdentifierValidator, SUPPORTED_KEK_ALGORITHMS};
