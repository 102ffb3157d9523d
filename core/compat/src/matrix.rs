//! OS support matrix for OS volume encryption.

use serde::Serialize;
use tracing::{debug, warn};

use adeprecheck_common::{DistroFacts, EncryptionStatus, Error, Result, Settings};

use crate::version::Version;

/// A distro release range that supports offline OS volume encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupportedRelease {
    /// Distro family, matched case-insensitively.
    pub family: &'static str,
    /// First supported release (inclusive).
    pub from: &'static str,
    /// First release past the range (exclusive).
    pub until: Option<&'static str>,
    /// Oldest kernel able to run the encryption engine, if any.
    pub min_kernel: Option<&'static str>,
}

/// A distro release range that can encrypt the OS volume online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OnlineEncryptionRelease {
    pub family: &'static str,
    pub from: &'static str,
    pub until: Option<&'static str>,
}

const fn release(
    family: &'static str,
    from: &'static str,
    until: &'static str,
    min_kernel: Option<&'static str>,
) -> SupportedRelease {
    SupportedRelease {
        family,
        from,
        until: Some(until),
        min_kernel,
    }
}

/// Releases supporting OS volume encryption.
pub static SUPPORTED_RELEASES: &[SupportedRelease] = &[
    release("Ubuntu", "14.04", "14.10", Some("4.15")),
    release("Ubuntu", "16.04", "16.10", Some("4.15")),
    release("Ubuntu", "18.04", "18.10", None),
    release("Ubuntu", "20.04", "20.10", None),
    release("Ubuntu", "22.04", "22.10", None),
    release("redhat", "7.2", "8.0", None),
    release("redhat", "8.1", "8.5", None),
    release("centos", "7.2", "8.0", None),
    release("centos", "8.1", "8.3", None),
    release("oracle", "7.8", "8.0", None),
];

/// Releases whose online encryption lifts the kernel and layout restrictions.
pub static ONLINE_ENCRYPTION_RELEASES: &[OnlineEncryptionRelease] = &[
    OnlineEncryptionRelease {
        family: "redhat",
        from: "8.5",
        until: Some("9.0"),
    },
    OnlineEncryptionRelease {
        family: "oracle",
        from: "8.5",
        until: Some("9.0"),
    },
];

fn in_range(version: &Version, from: &str, until: Option<&str>) -> bool {
    let until = until.map(Version::parse);
    version.within(&Version::parse(from), until.as_ref())
}

/// Lookup over the support and online-encryption tables.
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityMatrix {
    supported: &'static [SupportedRelease],
    online: &'static [OnlineEncryptionRelease],
}

impl CompatibilityMatrix {
    /// Matrix over the built-in tables.
    pub fn new() -> Self {
        Self::with_tables(SUPPORTED_RELEASES, ONLINE_ENCRYPTION_RELEASES)
    }

    pub fn with_tables(
        supported: &'static [SupportedRelease],
        online: &'static [OnlineEncryptionRelease],
    ) -> Self {
        Self { supported, online }
    }

    /// Support entry covering this distro release, if any.
    pub fn lookup(&self, family: &str, version: &str) -> Option<&'static SupportedRelease> {
        let version = Version::parse(version);
        self.supported.iter().find(|entry| {
            entry.family.eq_ignore_ascii_case(family) && in_range(&version, entry.from, entry.until)
        })
    }

    /// Whether this distro release can encrypt the OS volume online.
    pub fn supports_online_encryption(&self, family: &str, version: &str) -> bool {
        let version = Version::parse(version);
        self.online.iter().any(|entry| {
            entry.family.eq_ignore_ascii_case(family) && in_range(&version, entry.from, entry.until)
        })
    }

    /// Decide whether the OS volume may be encrypted on this platform.
    ///
    /// Passes when the OS volume is already encrypted, when the requested
    /// volume type leaves the OS volume alone, or when the release is in the
    /// online-encryption table. Otherwise the release must be in the support
    /// table with a kernel at or above its floor.
    ///
    /// # Errors
    /// - `UnsupportedOs` when the release is unknown or the kernel is too old
    /// - `InvalidVolumeType` when the settings carry no usable volume type
    pub fn is_supported_os(
        &self,
        settings: &Settings,
        distro: &DistroFacts,
        status: &EncryptionStatus,
    ) -> Result<()> {
        if status.os_encrypted() {
            debug!("OS volume already encrypted, skipping support matrix");
            return Ok(());
        }
        if !settings.volume_type()?.includes_os() {
            return Ok(());
        }
        if self.supports_online_encryption(&distro.family, &distro.version) {
            debug!(family = %distro.family, version = %distro.version, "online encryption release");
            return Ok(());
        }

        let unsupported = |reason: String| {
            warn!(family = %distro.family, version = %distro.version, %reason, "unsupported OS");
            Error::UnsupportedOs {
                family: distro.family.clone(),
                version: distro.version.clone(),
                kernel: distro.kernel_version.clone(),
                reason,
            }
        };

        let entry = self
            .lookup(&distro.family, &distro.version)
            .ok_or_else(|| unsupported("release is not supported for OS volume encryption".to_string()))?;

        if let Some(min_kernel) = entry.min_kernel {
            if Version::parse(&distro.kernel_version) < Version::parse(min_kernel) {
                return Err(unsupported(format!(
                    "kernel is not supported, upgrade to kernel {} or later",
                    min_kernel
                )));
            }
        }
        Ok(())
    }
}

impl Default for CompatibilityMatrix {
    fn default() -> Self {
        Self::new()
    }
}
