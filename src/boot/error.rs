//! Error types for the boot-facts stage.

/// Operational errors: precondition violations rather than declared
/// policy rejections. These are returned directly, never accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// `probe` was called on an already-sealed record.
    AlreadySealed,
    /// `seal` was called before `validate` returned `Accept`/`Warn`.
    NotValidated,
    /// `seal` was called on a record that already failed validation.
    ValidationFailed,
    /// The fatal CPU-identity probe step failed.
    CpuDetectionFailed,
    /// The fatal cache-topology probe step failed.
    CacheDetectionFailed,
    /// The fatal cpu-count probe step reported zero CPUs.
    NoCpusDetected,
}

impl BootError {
    /// Total, human-readable description of this error.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            BootError::AlreadySealed => "boot facts are already sealed",
            BootError::NotValidated => "boot facts have not been validated",
            BootError::ValidationFailed => "boot facts failed validation",
            BootError::CpuDetectionFailed => "fatal: CPU identity probe failed",
            BootError::CacheDetectionFailed => "fatal: cache topology probe failed",
            BootError::NoCpusDetected => "fatal: probe reported zero CPUs",
        }
    }
}

impl core::fmt::Display for BootError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostics produced by [`super::BootFacts::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootDiagnostic {
    /// `validate` was called before `probe`.
    NotProbed,
    /// Fewer than two CPUs detected.
    CpuCountTooLow {
        /// The detected count.
        count: u32,
    },
    /// No cache levels were probed.
    NoCacheLevels,
    /// No NUMA nodes were reported.
    NoNumaNodes,
    /// Neither AES-NI nor RDRAND (or both) are missing.
    ConstantTimeUnsupported,
    /// No hardware TRNG is available.
    TrngUnavailable,
    /// SMT is enabled (widens the side-channel surface).
    SmtEnabled,
    /// UEFI Secure Boot is disabled.
    SecureBootDisabled,
}

impl BootDiagnostic {
    /// Total, human-readable description of this diagnostic.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            BootDiagnostic::NotProbed => "boot facts were never probed",
            BootDiagnostic::CpuCountTooLow { .. } => "fewer than two CPUs detected",
            BootDiagnostic::NoCacheLevels => "no cache levels detected",
            BootDiagnostic::NoNumaNodes => "no NUMA nodes detected",
            BootDiagnostic::ConstantTimeUnsupported => "constant-time instruction support incomplete",
            BootDiagnostic::TrngUnavailable => "no hardware TRNG available",
            BootDiagnostic::SmtEnabled => "SMT is enabled",
            BootDiagnostic::SecureBootDisabled => "secure boot is disabled",
        }
    }
}

impl core::fmt::Display for BootDiagnostic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
