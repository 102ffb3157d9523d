//! adeprecheck - run disk-encryption prechecks from the command line.
//!
//! Reads the public settings and the current encryption status from JSON
//! files, runs the fatal or warning prechecks against the live system and
//! prints a machine-readable verdict on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use adeprecheck_common::{DistroFacts, EncryptionStatus, Settings, VmTopology, VolumeStatus, VolumeType};
use adeprecheck_engine::{PrecheckConfig, PrecheckOrchestrator};
use adeprecheck_keyvault::IdentifierValidator;

const KERNEL_RELEASE_PATH: &str = "/proc/sys/kernel/osrelease";

/// Exit code for a precheck that ran and failed.
const EXIT_PRECHECK_FAILED: u8 = 2;

#[derive(Parser)]
#[command(name = "adeprecheck")]
#[command(about = "Disk encryption prechecks")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fatal prechecks for the requested operation.
    Precheck {
        /// Public settings JSON file.
        #[arg(short, long)]
        settings: PathBuf,

        /// Encryption status JSON file (default: nothing encrypted).
        #[arg(long)]
        status: Option<PathBuf>,

        /// Distribution family, e.g. "Ubuntu" or "redhat".
        #[arg(long)]
        distro: String,

        /// Distribution version, e.g. "20.04".
        #[arg(long)]
        distro_version: String,

        /// Kernel version (default: the running kernel).
        #[arg(long)]
        kernel: Option<String>,

        /// The distribution can encrypt the OS volume online.
        #[arg(long)]
        online_encryption: bool,

        /// The VM is a scale set instance.
        #[arg(long)]
        scale_set: bool,

        /// Volume type already encrypted by an earlier run.
        #[arg(long)]
        current_volume_type: Option<String>,

        /// Engine configuration JSON file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Report non-fatal findings.
    Warnings {
        /// Engine configuration JSON file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Extract vault names from Key Vault references.
    InspectVault {
        /// Key Vault resource ID.
        #[arg(long)]
        resource_id: Option<String>,

        /// Key Vault URL.
        #[arg(long)]
        vault_url: Option<String>,

        /// Key encryption key URL.
        #[arg(long)]
        kek_url: Option<String>,

        /// Additional accepted vault DNS suffix.
        #[arg(long = "dns-suffix")]
        dns_suffixes: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
struct Verdict {
    passed: bool,
    code: Option<&'static str>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct VaultNames {
    resource_id: Option<String>,
    vault_url: Option<String>,
    kek_url: Option<String>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Precheck {
            settings,
            status,
            distro,
            distro_version,
            kernel,
            online_encryption,
            scale_set,
            current_volume_type,
            config,
        } => {
            let kernel = match kernel {
                Some(kernel) => kernel,
                None => running_kernel()?,
            };
            let distro =
                DistroFacts::new(distro, distro_version, kernel).with_online_encryption(online_encryption);
            let topology = if scale_set {
                VmTopology::ScaleSet
            } else {
                VmTopology::Standalone
            };
            cmd_precheck(
                &settings,
                status.as_deref(),
                &distro,
                topology,
                current_volume_type.as_deref(),
                config.as_deref(),
            )
        }

        Commands::Warnings { config } => cmd_warnings(config.as_deref()),

        Commands::InspectVault {
            resource_id,
            vault_url,
            kek_url,
            dns_suffixes,
        } => cmd_inspect_vault(
            resource_id.as_deref(),
            vault_url.as_deref(),
            kek_url.as_deref(),
            dns_suffixes,
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<PrecheckConfig> {
    match path {
        Some(path) => PrecheckConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(PrecheckConfig::default()),
    }
}

fn running_kernel() -> Result<String> {
    let release = std::fs::read_to_string(KERNEL_RELEASE_PATH)
        .context("Failed to read the running kernel version; pass --kernel")?;
    Ok(release.trim().to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run the fatal prechecks and print the verdict.
fn cmd_precheck(
    settings_path: &Path,
    status_path: Option<&Path>,
    distro: &DistroFacts,
    topology: VmTopology,
    current: Option<&str>,
    config_path: Option<&Path>,
) -> Result<ExitCode> {
    let config = load_config(config_path)?;

    let raw = std::fs::read_to_string(settings_path)
        .with_context(|| format!("Failed to read settings {}", settings_path.display()))?;
    let settings = Settings::from_json(&raw).context("Invalid settings")?;

    let status = match status_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read status {}", path.display()))?;
            EncryptionStatus::from_json(&raw).context("Invalid encryption status")?
        }
        None => EncryptionStatus::os(VolumeStatus::NotEncrypted),
    };

    let current = current
        .map(|raw| raw.parse::<VolumeType>())
        .transpose()
        .context("Invalid --current-volume-type")?;

    info!(
        family = %distro.family,
        version = %distro.version,
        kernel = %distro.kernel_version,
        topology = ?topology,
        "running fatal prechecks"
    );

    let orchestrator = PrecheckOrchestrator::system(config, topology);
    let verdict = match orchestrator.precheck_for_fatal_failures(&settings, &status, distro, current) {
        Ok(()) => Verdict {
            passed: true,
            code: None,
            message: None,
        },
        Err(err) => Verdict {
            passed: false,
            code: Some(err.code()),
            message: Some(err.to_string()),
        },
    };
    print_json(&verdict)?;

    Ok(if verdict.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_PRECHECK_FAILED)
    })
}

/// Print the warning list.
fn cmd_warnings(config_path: Option<&Path>) -> Result<ExitCode> {
    let config = load_config(config_path)?;
    let orchestrator = PrecheckOrchestrator::system(config, VmTopology::Standalone);
    print_json(&orchestrator.precheck_for_warnings())?;
    Ok(ExitCode::SUCCESS)
}

/// Print the vault names found in the given references.
fn cmd_inspect_vault(
    resource_id: Option<&str>,
    vault_url: Option<&str>,
    kek_url: Option<&str>,
    dns_suffixes: Vec<String>,
) -> Result<ExitCode> {
    let validator = dns_suffixes
        .into_iter()
        .fold(IdentifierValidator::new(), |v, suffix| v.with_dns_suffix(suffix));

    let names = VaultNames {
        resource_id: resource_id.and_then(|raw| validator.vault_name_from_id(raw)),
        vault_url: vault_url.and_then(|raw| validator.vault_name_from_url(raw)),
        kek_url: kek_url.and_then(|raw| validator.vault_name_from_kek_url(raw)),
    };
    print_json(&names)?;
    Ok(ExitCode::SUCCESS)
}
