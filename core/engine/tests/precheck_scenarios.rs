//! End-to-end precheck scenarios against scripted probes.

use std::sync::Arc;

use adeprecheck_common::{
    keys, DistroFacts, EncryptionStatus, OperationKind, Settings, VmTopology, VolumeStatus,
};
use adeprecheck_engine::{PrecheckConfig, PrecheckOrchestrator, Probes};
use adeprecheck_probe::fake::{FixedMemory, FixedMounts, ScriptedRunner};
use adeprecheck_probe::{AppCompatScanner, MountEntry};

const KV_ID: &str =
    "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rgname/providers/Microsoft.KeyVault/vaults/vaultname";

fn probes(runner: ScriptedRunner, memory_kib: u64) -> Probes {
    Probes {
        runner: Arc::new(runner),
        memory: Arc::new(FixedMemory::kib(memory_kib)),
        mounts: Arc::new(FixedMounts::new(vec![
            MountEntry::new("/dev/sda1", "/", "ext4"),
            MountEntry::new("/dev/sdb1", "/mnt/resource", "ext4"),
        ])),
        app_compat: AppCompatScanner::new(Vec::new()),
    }
}

fn orchestrator(runner: ScriptedRunner, memory_kib: u64) -> PrecheckOrchestrator {
    PrecheckOrchestrator::new(
        PrecheckConfig::default(),
        VmTopology::Standalone,
        probes(runner, memory_kib),
    )
}

fn request(vt: &str, op: OperationKind) -> Settings {
    Settings::new()
        .with(keys::VOLUME_TYPE, vt)
        .with(keys::ENCRYPTION_OPERATION, op.as_str())
}

fn not_encrypted() -> EncryptionStatus {
    EncryptionStatus::os(VolumeStatus::NotEncrypted)
}

#[test]
fn test_disable_data_passes_on_any_distro() {
    let o = orchestrator(ScriptedRunner::always(1), 1);
    for distro in [
        DistroFacts::new("Ubuntu", "12.04", ""),
        DistroFacts::new("Gentoo", "2.7", "6.1"),
        DistroFacts::new("redhat", "6.7", "2.6.32"),
    ] {
        o.precheck_for_fatal_failures(
            &request("DATA", OperationKind::Disable),
            &not_encrypted(),
            &distro,
            None,
        )
        .unwrap();
    }
}

#[test]
fn test_enable_all_checks_vault_names() {
    let o = orchestrator(ScriptedRunner::always(0), 8_000_000);
    let distro = DistroFacts::new("Ubuntu", "18.04", "5.4.0-1036-azure");

    let settings = request("ALL", OperationKind::Enable)
        .with(keys::KEY_VAULT_URL, "https://vaultname.vault.azure.net/")
        .with(keys::KEY_VAULT_RESOURCE_ID, KV_ID);
    o.precheck_for_fatal_failures(&settings, &not_encrypted(), &distro, None)
        .unwrap();

    let mismatched = settings.with(keys::KEY_VAULT_URL, "https://othervault.vault.azure.net/");
    let err = o
        .precheck_for_fatal_failures(&mismatched, &not_encrypted(), &distro, None)
        .unwrap_err();
    assert_eq!(err.code(), "NameMismatch");
}

#[test]
fn test_ubuntu_trusty_needs_hwe_kernel() {
    let o = orchestrator(ScriptedRunner::always(0), 8_000_000);
    let settings = request("ALL", OperationKind::Enable);

    let err = o
        .precheck_for_fatal_failures(
            &settings,
            &not_encrypted(),
            &DistroFacts::new("Ubuntu", "14.04", "4.4"),
            None,
        )
        .unwrap_err();
    assert_eq!(err.code(), "UnsupportedOS");

    o.precheck_for_fatal_failures(
        &settings,
        &not_encrypted(),
        &DistroFacts::new("Ubuntu", "14.04", "4.15"),
        None,
    )
    .unwrap();
}

#[test]
fn test_format_all_requires_memory_for_unencrypted_os() {
    let settings = request("ALL", OperationKind::EnableFormatAll);
    let distro = DistroFacts::new("Ubuntu", "18.04", "5.4");

    let low = orchestrator(ScriptedRunner::always(0), 6_000_000);
    let err = low
        .precheck_for_fatal_failures(&settings, &not_encrypted(), &distro, None)
        .unwrap_err();
    assert_eq!(err.code(), "InsufficientMemory");

    let enough = orchestrator(ScriptedRunner::always(0), 8_000_000);
    enough
        .precheck_for_fatal_failures(&settings, &not_encrypted(), &distro, None)
        .unwrap();

    let encrypted = EncryptionStatus::os(VolumeStatus::Encrypted);
    for kib in [1, 6_000_000, 8_000_000] {
        orchestrator(ScriptedRunner::always(0), kib)
            .precheck_for_fatal_failures(&settings, &encrypted, &distro, None)
            .unwrap();
    }
}

#[test]
fn test_lvm_layout_rules() {
    let distro = DistroFacts::new("Ubuntu", "14.04", "4.4");
    for op in [
        OperationKind::Enable,
        OperationKind::EnableFormat,
        OperationKind::EnableFormatAll,
        OperationKind::Disable,
    ] {
        for vt in ["OS", "Data", "All"] {
            orchestrator(ScriptedRunner::always(1), 8_000_000)
                .validator()
                .validate_lvm_os(&request(vt, op), &distro)
                .unwrap();
        }
    }

    let settings = request("ALL", OperationKind::Enable);
    let err = orchestrator(ScriptedRunner::exits(&[0, 1]), 8_000_000)
        .validator()
        .validate_lvm_os(&settings, &distro)
        .unwrap_err();
    assert_eq!(err.code(), "UnsupportedLvmLayout");

    let online = DistroFacts::new("Redhat", "8.2", "4.4").with_online_encryption(true);
    orchestrator(ScriptedRunner::exits(&[0, 1]), 8_000_000)
        .validator()
        .validate_lvm_os(&settings, &online)
        .unwrap();
}

#[test]
fn test_scale_set_online_encryption_allows_os() {
    let o = PrecheckOrchestrator::new(
        PrecheckConfig::default(),
        VmTopology::ScaleSet,
        probes(ScriptedRunner::always(0), 8_000_000),
    );
    let settings = request("All", OperationKind::Enable);

    let offline = DistroFacts::new("redhat", "7.9", "3.10.0");
    let err = o
        .precheck_for_fatal_failures(&settings, &not_encrypted(), &offline, None)
        .unwrap_err();
    assert_eq!(err.code(), "InvalidVolumeType");

    let online = DistroFacts::new("redhat", "8.5", "4.18.0").with_online_encryption(true);
    o.precheck_for_fatal_failures(&settings, &not_encrypted(), &online, None)
        .unwrap();
}
