//! Markers of software stacks known to break after encryption.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A path whose existence signals an incompatible software stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCompatMarker {
    /// Human-readable stack name used in warnings.
    pub name: String,
    /// Absolute path checked for existence.
    pub path: PathBuf,
}

impl AppCompatMarker {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Markers checked when none are configured.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("SAP HANA", "/hana/shared"),
            Self::new("SAP HANA", "/usr/sap"),
            Self::new("Oracle ASM", "/etc/oracleafd.conf"),
            Self::new("Oracle ASM", "/dev/oracleasm"),
        ]
    }
}

/// Checks marker paths relative to a filesystem root.
#[derive(Debug, Clone)]
pub struct AppCompatScanner {
    root: PathBuf,
    markers: Vec<AppCompatMarker>,
}

impl AppCompatScanner {
    /// Scanner over the live root filesystem.
    pub fn new(markers: Vec<AppCompatMarker>) -> Self {
        Self::with_root("/", markers)
    }

    /// Scanner resolving every marker beneath `root`.
    pub fn with_root(root: impl Into<PathBuf>, markers: Vec<AppCompatMarker>) -> Self {
        Self {
            root: root.into(),
            markers,
        }
    }

    /// Markers present on this system.
    pub fn detected(&self) -> Vec<&AppCompatMarker> {
        self.markers
            .iter()
            .filter(|marker| {
                let path = self.resolve(&marker.path);
                let present = path.is_file() || path.is_dir();
                if present {
                    debug!(stack = %marker.name, path = %path.display(), "app compat marker present");
                }
                present
            })
            .collect()
    }

    pub fn is_detected(&self) -> bool {
        !self.detected().is_empty()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }
}

impl Default for AppCompatScanner {
    fn default() -> Self {
        Self::new(AppCompatMarker::defaults())
    }
}
