//! Volume-type, Key Vault and system-layout validation.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use adeprecheck_common::{keys, DistroFacts, Error, Result, Settings, VmTopology, VolumeType};
use adeprecheck_keyvault::IdentifierValidator;
use adeprecheck_probe::{
    AppCompatScanner, CommandRunner, MemoryReader, MountEntry, MountTable, ProcMeminfo,
    ProcMounts, SystemCommandRunner,
};

use crate::config::PrecheckConfig;

/// Kernel module the encryption engine needs for the key volume.
const VFAT_MODULE: &str = "vfat";

/// Collaborators reading live system state.
#[derive(Clone)]
pub struct Probes {
    pub runner: Arc<dyn CommandRunner>,
    pub memory: Arc<dyn MemoryReader>,
    pub mounts: Arc<dyn MountTable>,
    pub app_compat: AppCompatScanner,
}

impl Probes {
    /// Probes backed by the running system.
    pub fn system(config: &PrecheckConfig) -> Self {
        Self {
            runner: Arc::new(SystemCommandRunner),
            memory: Arc::new(ProcMeminfo::default()),
            mounts: Arc::new(ProcMounts::default()),
            app_compat: AppCompatScanner::new(config.app_compat_markers.clone()),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryReader>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_mounts(mut self, mounts: Arc<dyn MountTable>) -> Self {
        self.mounts = mounts;
        self
    }

    pub fn with_app_compat(mut self, app_compat: AppCompatScanner) -> Self {
        self.app_compat = app_compat;
        self
    }
}

/// Validates settings against the VM's topology and live layout.
#[derive(Clone)]
pub struct ConfigValidator {
    config: PrecheckConfig,
    topology: VmTopology,
    probes: Probes,
    identifiers: IdentifierValidator,
}

impl ConfigValidator {
    pub fn new(config: PrecheckConfig, topology: VmTopology, probes: Probes) -> Self {
        let identifiers = config
            .extra_vault_dns_suffixes
            .iter()
            .fold(IdentifierValidator::new(), |v, suffix| v.with_dns_suffix(suffix.clone()));
        Self {
            config,
            topology,
            probes,
            identifiers,
        }
    }

    pub fn config(&self) -> &PrecheckConfig {
        &self.config
    }

    pub fn topology(&self) -> VmTopology {
        self.topology
    }

    pub fn probes(&self) -> &Probes {
        &self.probes
    }

    pub fn identifiers(&self) -> &IdentifierValidator {
        &self.identifiers
    }

    /// Check the requested volume type against this VM's topology.
    ///
    /// A standalone VM accepts OS, Data and All. A scale-set instance
    /// accepts Data, and OS or All only when `distro` can encrypt online.
    ///
    /// # Errors
    /// - `InvalidVolumeType` when the value is missing, empty, unknown or
    ///   not allowed on this topology
    pub fn validate_volume_type(
        &self,
        settings: &Settings,
        distro: Option<&DistroFacts>,
    ) -> Result<VolumeType> {
        let volume_type = settings.volume_type()?;
        if self.topology == VmTopology::ScaleSet
            && !VolumeType::SUPPORTED_SCALE_SET.contains(&volume_type)
            && !distro.is_some_and(|d| d.online_encryption_capable)
        {
            return Err(Error::InvalidVolumeType {
                value: volume_type.to_string(),
                reason: "scale set instances only support the Data volume type \
                         unless online encryption is available"
                    .to_string(),
            });
        }
        debug!(%volume_type, topology = ?self.topology, "volume type accepted");
        Ok(volume_type)
    }

    /// Check that an enable keeps to the volume type already in use.
    ///
    /// Requesting the current type or All always passes; any other change
    /// fails. Skipped for non-enable operations and when nothing has been
    /// encrypted yet (`current` is `None`).
    ///
    /// # Errors
    /// - `InvalidVolumeTypeTransition` for a disallowed change
    /// - `InvalidVolumeType` when an enable carries no usable volume type
    pub fn validate_volume_type_for_enable(
        &self,
        settings: &Settings,
        current: Option<VolumeType>,
    ) -> Result<()> {
        let Some(current) = current else {
            return Ok(());
        };
        if !settings.operation_opt().is_some_and(|op| op.is_enable()) {
            return Ok(());
        }

        let requested = settings.volume_type()?;
        if requested == current || requested == VolumeType::All {
            return Ok(());
        }
        Err(Error::InvalidVolumeTypeTransition {
            current: current.to_string(),
            requested: requested.to_string(),
        })
    }

    /// Validate Key Vault and KEK references when they are supplied.
    ///
    /// A vault URL and vault resource ID must come together and name the
    /// same vault; so must a KEK URL and KEK vault resource ID. A supplied
    /// key-encryption algorithm must be supported.
    pub fn validate_key_vault_settings(&self, settings: &Settings) -> Result<()> {
        let ids = &self.identifiers;
        let kv_url = settings.non_empty(keys::KEY_VAULT_URL);
        let kv_id = settings.non_empty(keys::KEY_VAULT_RESOURCE_ID);

        if kv_url.is_some() || kv_id.is_some() {
            let url = kv_url
                .map(|raw| ids.parse_vault_url(keys::KEY_VAULT_URL, raw))
                .transpose()?;
            let id = kv_id
                .map(|raw| ids.parse_resource_id(keys::KEY_VAULT_RESOURCE_ID, raw))
                .transpose()?;
            ids.cross_check_vault_names(id.as_ref(), url.as_ref())?;
        }

        let kek_url = settings.non_empty(keys::KEK_URL);
        let kek_id = settings.non_empty(keys::KEK_VAULT_RESOURCE_ID);
        if kek_url.is_some() || kek_id.is_some() {
            let url = kek_url
                .map(|raw| ids.parse_kek_url(keys::KEK_URL, raw))
                .transpose()?;
            let id = kek_id
                .map(|raw| ids.parse_resource_id(keys::KEK_VAULT_RESOURCE_ID, raw))
                .transpose()?;
            ids.cross_check_kek_names(id.as_ref(), url.as_ref())?;
        }

        if let Some(algorithm) = settings.non_empty(keys::KEY_ENCRYPTION_ALGORITHM) {
            ids.validate_key_encryption_algorithm(algorithm)?;
        }
        Ok(())
    }

    /// Reject an OS encryption when the root volume uses an unexpected LVM layout.
    ///
    /// Only enable operations targeting the OS volume are checked. Online
    /// encryption handles any layout, so the naming probe is skipped then.
    ///
    /// # Errors
    /// - `UnsupportedLvmLayout` when the root is on LVM but not on the
    ///   expected logical volume
    pub fn validate_lvm_os(&self, settings: &Settings, distro: &DistroFacts) -> Result<()> {
        let enable = settings.operation_opt().is_some_and(|op| op.is_enable());
        let targets_os = settings.volume_type().is_ok_and(|vt| vt.includes_os());
        if !enable || !targets_os {
            return Ok(());
        }

        if !self.probe_succeeds(&self.config.lvm_root_probe) {
            debug!("root filesystem is not on LVM");
            return Ok(());
        }
        if distro.online_encryption_capable {
            debug!("online encryption handles any LVM layout");
            return Ok(());
        }
        if self.probe_succeeds(&self.config.lvm_naming_probe) {
            return Ok(());
        }

        Err(Error::UnsupportedLvmLayout {
            reason: "the root filesystem is on LVM but not on the expected \
                     rootvg-rootlv logical volume"
                .to_string(),
        })
    }

    /// Load the vfat kernel module.
    ///
    /// # Errors
    /// - `ModuleLoadError` when `modprobe` cannot run or exits non-zero
    pub fn validate_vfat(&self) -> Result<()> {
        let outcome = self
            .probes
            .runner
            .run("modprobe", &[VFAT_MODULE])
            .map_err(|e| Error::ModuleLoadError {
                module: VFAT_MODULE.to_string(),
                reason: e.to_string(),
            })?;
        if outcome.success() {
            return Ok(());
        }

        let diagnostic = outcome.diagnostic();
        Err(Error::ModuleLoadError {
            module: VFAT_MODULE.to_string(),
            reason: if diagnostic.is_empty() {
                format!("modprobe exited with code {}", outcome.status)
            } else {
                format!("{} (exit code {})", diagnostic, outcome.status)
            },
        })
    }

    /// True when a block device is mounted beneath the resource disk, or
    /// when the mount table cannot be read.
    pub fn is_unsupported_mount_scheme(&self) -> bool {
        match self.mount_conflict() {
            Ok(conflict) => conflict.is_some(),
            Err(err) => {
                warn!(error = %err, "cannot read mount table");
                true
            }
        }
    }

    /// Fail when [`Self::is_unsupported_mount_scheme`] would be true.
    pub fn validate_mount_scheme(&self) -> Result<()> {
        match self.mount_conflict() {
            Ok(None) => Ok(()),
            Ok(Some(entry)) => Err(Error::UnsupportedMountScheme {
                device: entry.device,
                mount_point: entry.mount_point,
            }),
            Err(err) => Err(Error::UnsupportedMountScheme {
                device: format!("<unreadable mount table: {}>", err),
                mount_point: self.config.resource_disk_mount_point.clone(),
            }),
        }
    }

    /// True when a marker of a known-incompatible stack exists.
    pub fn is_app_compat_issue_detected(&self) -> bool {
        self.probes.app_compat.is_detected()
    }

    /// First non-root block device mounted beneath the resource disk.
    fn mount_conflict(&self) -> Result<Option<MountEntry>> {
        let resource = Path::new(&self.config.resource_disk_mount_point);
        let conflict = self.probes.mounts.mounts()?.into_iter().find(|entry| {
            let mount_point = Path::new(&entry.mount_point);
            entry.is_block_device()
                && entry.mount_point != "/"
                && mount_point != resource
                && mount_point.starts_with(resource)
        });
        if let Some(entry) = &conflict {
            info!(device = %entry.device, mount_point = %entry.mount_point, "mount conflicts with resource disk");
        }
        Ok(conflict)
    }

    fn probe_succeeds(&self, pipeline: &str) -> bool {
        match self.probes.runner.run("sh", &["-c", pipeline]) {
            Ok(outcome) => outcome.success(),
            Err(err) => {
                warn!(error = %err, pipeline, "probe could not run");
                false
            }
        }
    }
}
