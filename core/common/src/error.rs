//! Failure taxonomy for precheck operations.

use thiserror::Error;

/// Top-level error type for precheck operations.
///
/// Every variant is terminal for the current activation. The caller aborts
/// the encryption operation and reports [`Error::code`] upstream.
#[derive(Debug, Error)]
pub enum Error {
    /// A required setting is missing or malformed.
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// Volume type is empty, unknown or not allowed on this topology.
    #[error("Invalid volume type '{value}': {reason}")]
    InvalidVolumeType { value: String, reason: String },

    /// Requested volume type conflicts with the one already encrypted.
    #[error(
        "Invalid volume type transition: volume type '{current}' is already in use, \
         cannot switch to '{requested}' (use 'All' to extend encryption)"
    )]
    InvalidVolumeTypeTransition { current: String, requested: String },

    /// Key Vault resource ID does not follow the ARM grammar.
    #[error("Invalid Key Vault resource ID in {field}: '{value}'")]
    InvalidResourceId { field: String, value: String },

    /// Key Vault URL does not follow the vault endpoint grammar.
    #[error("Invalid Key Vault URL in {field}: '{value}'")]
    InvalidVaultUrl { field: String, value: String },

    /// Key-encryption-key URL does not follow the key endpoint grammar.
    #[error("Invalid key encryption key URL in {field}: '{value}'")]
    InvalidKekUrl { field: String, value: String },

    /// Vault name in a resource ID differs from the one in its URL.
    #[error("Vault name mismatch between {id_field} ('{id_name}') and {url_field} ('{url_name}')")]
    NameMismatch {
        id_field: String,
        id_name: String,
        url_field: String,
        url_name: String,
    },

    /// Key-encryption algorithm is not one the engine can wrap keys with.
    #[error("Unsupported key encryption algorithm '{value}'")]
    InvalidKeyEncryptionAlgorithm { value: String },

    /// Distro, version or kernel cannot host OS volume encryption.
    #[error("Unsupported OS {family} {version} (kernel '{kernel}'): {reason}")]
    UnsupportedOs {
        family: String,
        version: String,
        kernel: String,
        reason: String,
    },

    /// Not enough memory for a full-format OS encryption.
    #[error("Insufficient memory: {available_kib} KiB available, {required_kib} KiB required")]
    InsufficientMemory { available_kib: u64, required_kib: u64 },

    /// OS volume sits on an LVM layout the engine cannot handle.
    #[error("Unsupported LVM layout: {reason}")]
    UnsupportedLvmLayout { reason: String },

    /// A required kernel module could not be loaded.
    #[error("Failed to load kernel module '{module}': {reason}")]
    ModuleLoadError { module: String, reason: String },

    /// A mount conflicts with the encryption layout.
    #[error("Unsupported mount scheme: {device} mounted at {mount_point}")]
    UnsupportedMountScheme { device: String, mount_point: String },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable identifier for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidConfiguration { .. } => "InvalidConfiguration",
            Error::InvalidVolumeType { .. } => "InvalidVolumeType",
            Error::InvalidVolumeTypeTransition { .. } => "InvalidVolumeTypeTransition",
            Error::InvalidResourceId { .. } => "InvalidResourceId",
            Error::InvalidVaultUrl { .. } => "InvalidVaultUrl",
            Error::InvalidKekUrl { .. } => "InvalidKekUrl",
            Error::NameMismatch { .. } => "NameMismatch",
            Error::InvalidKeyEncryptionAlgorithm { .. } => "InvalidKeyEncryptionAlgorithm",
            Error::UnsupportedOs { .. } => "UnsupportedOS",
            Error::InsufficientMemory { .. } => "InsufficientMemory",
            Error::UnsupportedLvmLayout { .. } => "UnsupportedLvmLayout",
            Error::ModuleLoadError { .. } => "ModuleLoadError",
            Error::UnsupportedMountScheme { .. } => "UnsupportedMountScheme",
            Error::Io(_) => "Io",
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
