//! Memory sufficiency for full-format OS encryption.

use tracing::{debug, warn};

use adeprecheck_common::{EncryptionStatus, Error, OperationKind, Result, Settings, VolumeStatus};
use adeprecheck_probe::MemoryReader;

/// Minimum total memory, in KiB as reported by `MemTotal`, for encrypting
/// the OS volume in place.
pub const MIN_MEMORY_KIB: u64 = 7_000_000;

/// Memory threshold checks over a [`MemoryReader`].
pub struct MemoryGate<'a> {
    reader: &'a dyn MemoryReader,
    min_kib: u64,
}

impl<'a> MemoryGate<'a> {
    pub fn new(reader: &'a dyn MemoryReader) -> Self {
        Self {
            reader,
            min_kib: MIN_MEMORY_KIB,
        }
    }

    /// Override the threshold.
    pub fn with_min_kib(mut self, min_kib: u64) -> Self {
        self.min_kib = min_kib;
        self
    }

    pub fn min_kib(&self) -> u64 {
        self.min_kib
    }

    /// Total memory, or `None` when it cannot be read.
    fn available_kib(&self) -> Option<u64> {
        match self.reader.total_memory_kib() {
            Ok(kib) => Some(kib),
            Err(err) => {
                warn!(error = %err, "cannot read total memory");
                None
            }
        }
    }

    /// True when total memory is below the threshold or unreadable.
    pub fn is_insufficient_memory(&self) -> bool {
        self.available_kib().map_or(true, |kib| kib < self.min_kib)
    }

    /// Reject a format-all OS encryption on a machine without enough memory.
    ///
    /// Every other combination passes without reading memory.
    ///
    /// # Errors
    /// - `InsufficientMemory` when the operation is `EnableFormatAll`, the OS
    ///   volume is targeted and not yet encrypted, and memory is insufficient
    pub fn validate_memory_for_os_encryption(
        &self,
        settings: &Settings,
        status: &EncryptionStatus,
    ) -> Result<()> {
        let format_all = settings.operation_opt() == Some(OperationKind::EnableFormatAll);
        let targets_os = settings.volume_type().is_ok_and(|vt| vt.includes_os());
        if !format_all || !targets_os || status.os != VolumeStatus::NotEncrypted {
            return Ok(());
        }

        let available = self.available_kib();
        match available {
            Some(kib) if kib >= self.min_kib => {
                debug!(available_kib = kib, "memory sufficient for OS encryption");
                Ok(())
            }
            _ => Err(Error::InsufficientMemory {
                available_kib: available.unwrap_or(0),
                required_kib: self.min_kib,
            }),
        }
    }
}
