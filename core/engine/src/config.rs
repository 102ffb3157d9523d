//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use adeprecheck_common::{Error, Result};
use adeprecheck_compat::MIN_MEMORY_KIB;
use adeprecheck_probe::AppCompatMarker;

/// Exits 0 when the root filesystem sits on a logical volume.
pub const DEFAULT_LVM_ROOT_PROBE: &str = "lsblk -o TYPE,MOUNTPOINT | grep lvm | grep -q '/$'";

/// Exits 0 when the root logical volume follows the `rootvg-rootlv` naming.
pub const DEFAULT_LVM_NAMING_PROBE: &str =
    "lsblk -o NAME,TYPE,MOUNTPOINT | grep rootvg-rootlv | grep lvm | grep -q '/$'";

/// Where the platform mounts the temporary resource disk.
pub const DEFAULT_RESOURCE_DISK_MOUNT_POINT: &str = "/mnt/resource";

/// Tunables for the precheck engine.
///
/// Every field has a default, so an empty JSON object is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecheckConfig {
    /// Minimum `MemTotal` in KiB for a format-all OS encryption.
    pub min_memory_kib: u64,
    /// Vault DNS suffixes accepted besides the cloud defaults.
    pub extra_vault_dns_suffixes: Vec<String>,
    /// Shell pipeline probing for an LVM root volume.
    pub lvm_root_probe: String,
    /// Shell pipeline probing the root logical volume name.
    pub lvm_naming_probe: String,
    /// Mount point of the resource disk.
    pub resource_disk_mount_point: String,
    /// Paths marking incompatible software stacks.
    pub app_compat_markers: Vec<AppCompatMarker>,
}

impl Default for PrecheckConfig {
    fn default() -> Self {
        Self {
            min_memory_kib: MIN_MEMORY_KIB,
            extra_vault_dns_suffixes: Vec::new(),
            lvm_root_probe: DEFAULT_LVM_ROOT_PROBE.to_string(),
            lvm_naming_probe: DEFAULT_LVM_NAMING_PROBE.to_string(),
            resource_disk_mount_point: DEFAULT_RESOURCE_DISK_MOUNT_POINT.to_string(),
            app_compat_markers: AppCompatMarker::defaults(),
        }
    }
}

impl PrecheckConfig {
    pub fn with_min_memory_kib(mut self, min_kib: u64) -> Self {
        self.min_memory_kib = min_kib;
        self
    }

    /// Accept an additional vault DNS suffix (e.g. a test endpoint).
    pub fn with_vault_dns_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.extra_vault_dns_suffixes.push(suffix.into());
        self
    }

    pub fn with_resource_disk_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.resource_disk_mount_point = mount_point.into();
        self
    }

    pub fn with_app_compat_markers(mut self, markers: Vec<AppCompatMarker>) -> Self {
        self.app_compat_markers = markers;
        self
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfiguration {
            field: "precheck config".to_string(),
            reason: e.to_string(),
        })
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidConfiguration {
            field: "precheck config".to_string(),
            reason: e.to_string(),
        })
    }

    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}
