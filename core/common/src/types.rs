//! Value types supplied to every precheck call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Volume class targeted by an encryption operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeType {
    Os,
    Data,
    All,
}

impl VolumeType {
    /// Every volume type accepted on a standalone VM.
    pub const SUPPORTED: [VolumeType; 3] = [VolumeType::Os, VolumeType::Data, VolumeType::All];

    /// Volume types a scale-set instance accepts without online encryption.
    pub const SUPPORTED_SCALE_SET: [VolumeType; 1] = [VolumeType::Data];

    /// Canonical spelling used in settings and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeType::Os => "OS",
            VolumeType::Data => "Data",
            VolumeType::All => "All",
        }
    }

    /// Whether the OS volume is part of the targeted set.
    pub fn includes_os(&self) -> bool {
        matches!(self, VolumeType::Os | VolumeType::All)
    }
}

impl FromStr for VolumeType {
    type Err = Error;

    /// Case-insensitive parse; empty and unknown values are rejected.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "os" => Ok(VolumeType::Os),
            "data" => Ok(VolumeType::Data),
            "all" => Ok(VolumeType::All),
            "" => Err(Error::InvalidVolumeType {
                value: s.to_string(),
                reason: "volume type is empty".to_string(),
            }),
            _ => Err(Error::InvalidVolumeType {
                value: s.to_string(),
                reason: "expected one of OS, Data, All".to_string(),
            }),
        }
    }
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested encryption operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Disable,
    Enable,
    EnableFormat,
    EnableFormatAll,
    QueryStatus,
}

impl OperationKind {
    /// Setting value naming this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Disable => "DisableEncryption",
            OperationKind::Enable => "EnableEncryption",
            OperationKind::EnableFormat => "EnableEncryptionFormat",
            OperationKind::EnableFormatAll => "EnableEncryptionFormatAll",
            OperationKind::QueryStatus => "QueryEncryptionStatus",
        }
    }

    /// Enable, EnableFormat and EnableFormatAll.
    pub fn is_enable(&self) -> bool {
        matches!(
            self,
            OperationKind::Enable | OperationKind::EnableFormat | OperationKind::EnableFormatAll
        )
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        [
            OperationKind::Disable,
            OperationKind::Enable,
            OperationKind::EnableFormat,
            OperationKind::EnableFormatAll,
            OperationKind::QueryStatus,
        ]
        .into_iter()
        .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| Error::InvalidConfiguration {
            field: crate::keys::ENCRYPTION_OPERATION.to_string(),
            reason: format!("unknown encryption operation '{}'", s),
        })
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the VM was provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VmTopology {
    #[default]
    Standalone,
    ScaleSet,
}

/// Immutable snapshot of the platform detected by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroFacts {
    /// Distro family name as reported by the platform (e.g. "Ubuntu", "redhat").
    pub family: String,
    /// Distro release version (e.g. "18.04", "7.2.1511").
    pub version: String,
    /// Running kernel release (e.g. "4.15.0-1034-azure").
    pub kernel_version: String,
    /// Whether the platform can encrypt the OS volume online.
    pub online_encryption_capable: bool,
}

impl DistroFacts {
    /// Create facts for a platform without online encryption.
    pub fn new(
        family: impl Into<String>,
        version: impl Into<String>,
        kernel_version: impl Into<String>,
    ) -> Self {
        Self {
            family: family.into(),
            version: version.into(),
            kernel_version: kernel_version.into(),
            online_encryption_capable: false,
        }
    }

    /// Set the online encryption capability.
    pub fn with_online_encryption(mut self, capable: bool) -> Self {
        self.online_encryption_capable = capable;
        self
    }
}

/// Encryption state of one volume class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeStatus {
    Encrypted,
    NotEncrypted,
    EncryptionInProgress,
    DecryptionInProgress,
    #[serde(rename = "VMRestartPending")]
    VmRestartPending,
    NotMounted,
    #[serde(other)]
    Unknown,
}

/// Per-volume-class encryption snapshot supplied by the status tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionStatus {
    pub os: VolumeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<VolumeStatus>,
}

impl EncryptionStatus {
    /// Snapshot with only the OS entry populated.
    pub fn os(os: VolumeStatus) -> Self {
        Self { os, data: None }
    }

    /// Parse a status snapshot such as `{"os": "NotEncrypted", "data": "Encrypted"}`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfiguration {
            field: "encryption status".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn os_encrypted(&self) -> bool {
        self.os == VolumeStatus::Encrypted
    }
}
