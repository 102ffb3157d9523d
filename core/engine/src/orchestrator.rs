//! Fail-fast precheck entry point.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use adeprecheck_common::{
    DistroFacts, EncryptionStatus, OperationKind, Result, Settings, VmTopology, VolumeType,
};
use adeprecheck_compat::{CompatibilityMatrix, MemoryGate};

use crate::config::PrecheckConfig;
use crate::validator::{ConfigValidator, Probes};

/// One fatal precheck step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Check {
    VolumeType,
    VolumeTypeTransition,
    KeyVault,
    SupportedOs,
    Memory,
    LvmOs,
    Vfat,
    MountScheme,
}

const DISABLE_PLAN: &[Check] = &[Check::VolumeType, Check::SupportedOs];
const ENABLE_PLAN: &[Check] = &[
    Check::VolumeType,
    Check::VolumeTypeTransition,
    Check::KeyVault,
    Check::SupportedOs,
    Check::LvmOs,
    Check::Vfat,
];
const ENABLE_FORMAT_ALL_PLAN: &[Check] = &[
    Check::VolumeType,
    Check::VolumeTypeTransition,
    Check::KeyVault,
    Check::SupportedOs,
    Check::Memory,
    Check::LvmOs,
    Check::Vfat,
    Check::MountScheme,
];
const QUERY_STATUS_PLAN: &[Check] = &[];

impl Check {
    /// Fatal checks for `operation`, in execution order.
    pub fn plan(operation: OperationKind) -> &'static [Check] {
        match operation {
            OperationKind::Disable => DISABLE_PLAN,
            OperationKind::Enable | OperationKind::EnableFormat => ENABLE_PLAN,
            OperationKind::EnableFormatAll => ENABLE_FORMAT_ALL_PLAN,
            OperationKind::QueryStatus => QUERY_STATUS_PLAN,
        }
    }
}

/// Non-fatal finding reported before an encryption operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum PrecheckWarning {
    /// Software known to break after encryption is installed.
    AppCompat { stacks: Vec<String> },
    /// Memory is below the format-all threshold.
    InsufficientMemory { required_kib: u64 },
    /// A mount conflicts with the resource disk.
    UnsupportedMountScheme,
}

/// Runs every precheck for a requested operation.
pub struct PrecheckOrchestrator {
    validator: ConfigValidator,
    matrix: CompatibilityMatrix,
}

impl PrecheckOrchestrator {
    pub fn new(config: PrecheckConfig, topology: VmTopology, probes: Probes) -> Self {
        Self {
            validator: ConfigValidator::new(config, topology, probes),
            matrix: CompatibilityMatrix::new(),
        }
    }

    /// Orchestrator over the running system's probes.
    pub fn system(config: PrecheckConfig, topology: VmTopology) -> Self {
        let probes = Probes::system(&config);
        Self::new(config, topology, probes)
    }

    /// Replace the support matrix.
    pub fn with_matrix(mut self, matrix: CompatibilityMatrix) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn validator(&self) -> &ConfigValidator {
        &self.validator
    }

    pub fn matrix(&self) -> &CompatibilityMatrix {
        &self.matrix
    }

    pub fn memory_gate(&self) -> MemoryGate<'_> {
        MemoryGate::new(self.validator.probes().memory.as_ref())
            .with_min_kib(self.validator.config().min_memory_kib)
    }

    /// Run the fatal checks for the requested operation, stopping at the first failure.
    ///
    /// `current` is the volume type a previous enable left encrypted, if any.
    /// A clean return is the only authorization for the encryption engine.
    ///
    /// # Errors
    /// - `InvalidConfiguration` when no valid operation is requested
    /// - The error of the first failing check otherwise
    pub fn precheck_for_fatal_failures(
        &self,
        settings: &Settings,
        status: &EncryptionStatus,
        distro: &DistroFacts,
        current: Option<VolumeType>,
    ) -> Result<()> {
        let operation = settings.operation().inspect_err(|err| {
            warn!(code = err.code(), error = %err, "precheck failed");
        })?;
        info!(%operation, "running fatal prechecks");

        for check in Check::plan(operation) {
            debug!(?check, "running check");
            if let Err(err) = self.run_check(*check, settings, status, distro, current) {
                warn!(?check, code = err.code(), error = %err, "precheck failed");
                return Err(err);
            }
        }

        info!(%operation, "fatal prechecks passed");
        Ok(())
    }

    /// Run the non-fatal probes and report what they found.
    pub fn precheck_for_warnings(&self) -> Vec<PrecheckWarning> {
        let mut warnings = Vec::new();

        // One stack may leave several markers.
        let stacks: Vec<String> = self
            .validator
            .probes()
            .app_compat
            .detected()
            .into_iter()
            .map(|marker| marker.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !stacks.is_empty() {
            warn!(?stacks, "software known to conflict with disk encryption is installed");
            warnings.push(PrecheckWarning::AppCompat { stacks });
        }

        let gate = self.memory_gate();
        if gate.is_insufficient_memory() {
            warn!(required_kib = gate.min_kib(), "memory below the format-all threshold");
            warnings.push(PrecheckWarning::InsufficientMemory {
                required_kib: gate.min_kib(),
            });
        }

        if self.validator.is_unsupported_mount_scheme() {
            warn!("mount scheme conflicts with the resource disk");
            warnings.push(PrecheckWarning::UnsupportedMountScheme);
        }

        warnings
    }

    fn run_check(
        &self,
        check: Check,
        settings: &Settings,
        status: &EncryptionStatus,
        distro: &DistroFacts,
        current: Option<VolumeType>,
    ) -> Result<()> {
        match check {
            Check::VolumeType => self.validator.validate_volume_type(settings, Some(distro)).map(drop),
            Check::VolumeTypeTransition => self.validator.validate_volume_type_for_enable(settings, current),
            Check::KeyVault => self.validator.validate_key_vault_settings(settings),
            Check::SupportedOs => self.matrix.is_supported_os(settings, distro, status),
            Check::Memory => self.memory_gate().validate_memory_for_os_encryption(settings, status),
            Check::LvmOs => self.validator.validate_lvm_os(settings, distro),
            Check::Vfat => self.validator.validate_vfat(),
            Check::MountScheme => self.validator.validate_mount_scheme(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adeprecheck_common::{keys, VolumeStatus};
    use adeprecheck_probe::fake::{FixedMemory, FixedMounts, ScriptedRunner};
    use adeprecheck_probe::{AppCompatMarker, AppCompatScanner, CommandRunner, MountEntry};
    use std::sync::Arc;

    const KV_ID: &str =
        "/subscriptions/subid/resourceGroups/rgname/providers/Microsoft.KeyVault/vaults/vaultname";
    const KV_URL: &str = "https://vaultname.vault.azure.net/";
    const KEK_URL: &str = "https://vaultname.vault.azure.net/keys/keyname/ver";

    fn probes(runner: Arc<ScriptedRunner>, memory_kib: u64) -> Probes {
        Probes {
            runner: runner as Arc<dyn CommandRunner>,
            memory: Arc::new(FixedMemory::kib(memory_kib)),
            mounts: Arc::new(FixedMounts::new(vec![MountEntry::new("/dev/sda1", "/", "ext4")])),
            app_compat: AppCompatScanner::new(Vec::new()),
        }
    }

    fn orchestrator(runner: Arc<ScriptedRunner>) -> PrecheckOrchestrator {
        PrecheckOrchestrator::new(
            PrecheckConfig::default(),
            VmTopology::Standalone,
            probes(runner, 8_000_000),
        )
    }

    fn not_encrypted() -> EncryptionStatus {
        EncryptionStatus::os(VolumeStatus::NotEncrypted)
    }

    fn ubuntu(kernel: &str) -> DistroFacts {
        DistroFacts::new("Ubuntu", "14.04", kernel)
    }

    fn request(vt: &str, op: OperationKind) -> Settings {
        Settings::new()
            .with(keys::VOLUME_TYPE, vt)
            .with(keys::ENCRYPTION_OPERATION, op.as_str())
    }

    fn with_kek(settings: Settings) -> Settings {
        settings
            .with(keys::KEY_VAULT_URL, KV_URL)
            .with(keys::KEY_VAULT_RESOURCE_ID, KV_ID)
            .with(keys::KEK_URL, KEK_URL)
            .with(keys::KEK_VAULT_RESOURCE_ID, KV_ID)
    }

    #[test]
    fn test_plans() {
        assert!(Check::plan(OperationKind::QueryStatus).is_empty());
        assert_eq!(Check::plan(OperationKind::Disable), &[Check::VolumeType, Check::SupportedOs]);
        assert!(!Check::plan(OperationKind::Enable).contains(&Check::Memory));
        assert!(Check::plan(OperationKind::EnableFormatAll).contains(&Check::Memory));
        assert_eq!(Check::plan(OperationKind::EnableFormat), Check::plan(OperationKind::Enable));
        for op in [OperationKind::Enable, OperationKind::EnableFormatAll] {
            assert_eq!(&Check::plan(op)[..4], &[
                    Check::VolumeType,
                    Check::VolumeTypeTransition,
                    Check::KeyVault,
                    Check::SupportedOs,
                ]);
        }
    }

    #[test]
    fn test_fatal_checks_pass() {
        let o = orchestrator(Arc::new(ScriptedRunner::always(0)));
        let distro = ubuntu("4.15");

        o.precheck_for_fatal_failures(
            &request("DATA", OperationKind::Disable),
            &not_encrypted(),
            &distro,
            None,
        )
        .unwrap();

        let settings = request("ALL", OperationKind::Enable)
            .with(keys::KEY_VAULT_URL, KV_URL)
            .with(keys::KEY_VAULT_RESOURCE_ID, KV_ID);
        o.precheck_for_fatal_failures(&settings, &not_encrypted(), &distro, None)
            .unwrap();

        let settings = with_kek(request("ALL", OperationKind::EnableFormat));
        o.precheck_for_fatal_failures(&settings, &not_encrypted(), &distro, None)
            .unwrap();

        let settings = with_kek(request("ALL", OperationKind::EnableFormatAll))
            .with(keys::KEY_ENCRYPTION_ALGORITHM, "rsa-OAEP-256");
        o.precheck_for_fatal_failures(&settings, &not_encrypted(), &distro, None)
            .unwrap();
    }

    #[test]
    fn test_fatal_checks_fail() {
        let o = orchestrator(Arc::new(ScriptedRunner::always(0)));
        let distro = ubuntu("4.15");

        let err = o
            .precheck_for_fatal_failures(&Settings::new(), &not_encrypted(), &distro, None)
            .unwrap_err();
        assert_eq!(err.code(), "InvalidConfiguration");

        let settings = request("123", OperationKind::Enable);
        let err = o
            .precheck_for_fatal_failures(&settings, &not_encrypted(), &distro, None)
            .unwrap_err();
        assert_eq!(err.code(), "InvalidVolumeType");

        let settings = with_kek(request("ALL", OperationKind::EnableFormatAll))
            .with(keys::KEY_ENCRYPTION_ALGORITHM, "rsa-OAEP-25600");
        let err = o
            .precheck_for_fatal_failures(&settings, &not_encrypted(), &distro, None)
            .unwrap_err();
        assert_eq!(err.code(), "InvalidKeyEncryptionAlgorithm");

        let err = o
            .precheck_for_fatal_failures(
                &Settings::new().with(keys::VOLUME_TYPE, "ALL"),
                &not_encrypted(),
                &ubuntu("4.4"),
                None,
            )
            .unwrap_err();
        assert_eq!(err.code(), "InvalidConfiguration");
    }

    #[test]
    fn test_query_status_runs_nothing() {
        let runner = Arc::new(ScriptedRunner::always(1));
        let o = orchestrator(runner.clone());
        let settings = Settings::new().with(keys::ENCRYPTION_OPERATION, "QueryEncryptionStatus");
        o.precheck_for_fatal_failures(&settings, &not_encrypted(), &ubuntu("4.4"), Some(VolumeType::Data))
            .unwrap();
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_first_failure_stops_the_run() {
        let runner = Arc::new(ScriptedRunner::always(0));
        let o = orchestrator(runner.clone());
        let settings = request("ALL", OperationKind::Enable);
        let err = o
            .precheck_for_fatal_failures(&settings, &not_encrypted(), &ubuntu("4.4"), None)
            .unwrap_err();
        assert_eq!(err.code(), "UnsupportedOS");
        // LVM and vfat probes come after the OS check and never ran.
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_transition_checked_before_key_vault() {
        let o = orchestrator(Arc::new(ScriptedRunner::always(0)));
        let settings = request("OS", OperationKind::Enable).with(keys::KEY_VAULT_URL, "http://bad/");
        let err = o
            .precheck_for_fatal_failures(&settings, &not_encrypted(), &ubuntu("4.15"), Some(VolumeType::Data))
            .unwrap_err();
        assert_eq!(err.code(), "InvalidVolumeTypeTransition");
    }

    #[test]
    fn test_vfat_failure_is_fatal_for_enable() {
        // Data only, so the LVM probe is skipped; modprobe exits 1.
        let o = orchestrator(Arc::new(ScriptedRunner::always(1)));
        let err = o
            .precheck_for_fatal_failures(
                &request("Data", OperationKind::Enable),
                &not_encrypted(),
                &ubuntu("4.15"),
                None,
            )
            .unwrap_err();
        assert_eq!(err.code(), "ModuleLoadError");
    }

    #[test]
    fn test_mount_scheme_fatal_for_format_all_only() {
        let mounts = Arc::new(FixedMounts::new(vec![
            MountEntry::new("/dev/sda1", "/", "ext4"),
            MountEntry::new("/dev/sdb1", "/mnt/resource", "ext4"),
            MountEntry::new("/dev/sdc1", "/mnt/resource/scratch", "xfs"),
        ]));
        let o = PrecheckOrchestrator::new(
            PrecheckConfig::default(),
            VmTopology::Standalone,
            probes(Arc::new(ScriptedRunner::always(0)), 8_000_000).with_mounts(mounts),
        );
        let distro = ubuntu("4.15");

        o.precheck_for_fatal_failures(&request("Data", OperationKind::Enable), &not_encrypted(), &distro, None)
            .unwrap();
        let err = o
            .precheck_for_fatal_failures(
                &request("Data", OperationKind::EnableFormatAll),
                &not_encrypted(),
                &distro,
                None,
            )
            .unwrap_err();
        assert_eq!(err.code(), "UnsupportedMountScheme");
    }

    #[test]
    fn test_warnings_clean_system() {
        let o = orchestrator(Arc::new(ScriptedRunner::new()));
        assert!(o.precheck_for_warnings().is_empty());
    }

    #[test]
    fn test_warnings_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("hana/shared")).unwrap();
        let scanner = AppCompatScanner::with_root(dir.path(), AppCompatMarker::defaults());

        let o = PrecheckOrchestrator::new(
            PrecheckConfig::default(),
            VmTopology::Standalone,
            probes(Arc::new(ScriptedRunner::new()), 6_000_000)
                .with_mounts(Arc::new(FixedMounts::unreadable()))
                .with_app_compat(scanner),
        );
        let warnings = o.precheck_for_warnings();
        assert_eq!(
            warnings,
            vec![
                PrecheckWarning::AppCompat {
                    stacks: vec!["SAP HANA".to_string()]
                },
                PrecheckWarning::InsufficientMemory {
                    required_kib: 7_000_000
                },
                PrecheckWarning::UnsupportedMountScheme,
            ]
        );
    }

    #[test]
    fn test_app_compat_stack_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("hana/shared")).unwrap();
        std::fs::create_dir_all(dir.path().join("usr/sap")).unwrap();
        let scanner = AppCompatScanner::with_root(dir.path(), AppCompatMarker::defaults());

        let o = PrecheckOrchestrator::new(
            PrecheckConfig::default(),
            VmTopology::Standalone,
            probes(Arc::new(ScriptedRunner::new()), 8_000_000).with_app_compat(scanner),
        );
        assert_eq!(
            o.precheck_for_warnings(),
            vec![PrecheckWarning::AppCompat {
                stacks: vec!["SAP HANA".to_string()]
            }]
        );
    }

    #[test]
    fn test_configured_memory_threshold() {
        let o = PrecheckOrchestrator::new(
            PrecheckConfig::default().with_min_memory_kib(4_000_000),
            VmTopology::Standalone,
            probes(Arc::new(ScriptedRunner::always(0)), 6_000_000),
        );
        o.precheck_for_fatal_failures(
            &request("ALL", OperationKind::EnableFormatAll),
            &not_encrypted(),
            &ubuntu("4.15"),
            None,
        )
        .unwrap();
    }
}
