//! Error types for the topology stage.

/// Operational errors: precondition violations rather than declared
/// policy rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyError {
    /// `seal` was called before `validate` returned `Accept`/`Warn`.
    NotValidated,
    /// `seal` was called on a record that already failed validation.
    ValidationFailed,
    /// `seal` was called before the isolation matrix was computed.
    MatrixNotComputed,
    /// A core id passed to a query or probe step was out of range.
    CoreIndexOutOfRange,
    /// `boot_facts.cpu_count()` exceeds `MAX_CORES`.
    CapacityExceeded,
}

impl TopologyError {
    /// Total, human-readable description of this error.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TopologyError::NotValidated => "topology has not been validated",
            TopologyError::ValidationFailed => "topology failed validation",
            TopologyError::MatrixNotComputed => "cache isolation matrix not computed",
            TopologyError::CoreIndexOutOfRange => "core index out of range",
            TopologyError::CapacityExceeded => "cpu count exceeds MAX_CORES",
        }
    }
}

impl core::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostics produced by [`super::Topology::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyDiagnostic {
    /// A core was never probed.
    CoreNotProbed {
        /// The unprobed core id.
        core: u32,
    },
    /// `core_count` disagrees with the sealed boot facts.
    CoreCountMismatch {
        /// Expected count, from boot facts.
        expected: u32,
        /// Actual count derived during probing.
        actual: u32,
    },
    /// A core's SMT sibling id is out of range.
    SmtSiblingInvalid {
        /// The offending core.
        core: u32,
        /// The invalid sibling id.
        sibling: u32,
    },
    /// Two cores' cache-domain ids violate the nesting invariant:
    /// sharing a finer level without sharing the coarser level that
    /// contains it.
    CacheDomainNestingViolation {
        /// First core of the offending pair.
        core_a: u32,
        /// Second core of the offending pair.
        core_b: u32,
    },
    /// Dynamic frequency scaling is enabled on a core (breaks the
    /// determinism guarantee).
    FreqScalingEnabled {
        /// The offending core.
        core: u32,
    },
    /// SMT is enabled platform-wide.
    SmtEnabled,
    /// Not every online core has identical frequency/cache-hierarchy
    /// facts.
    AsymmetricTopology,
    /// The NUMA distance matrix is not symmetric.
    NumaDistanceAsymmetric,
}

impl TopologyDiagnostic {
    /// Total, human-readable description of this diagnostic.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TopologyDiagnostic::CoreNotProbed { .. } => "a core was never probed",
            TopologyDiagnostic::CoreCountMismatch { .. } => "core count disagrees with boot facts",
            TopologyDiagnostic::SmtSiblingInvalid { .. } => "SMT sibling id out of range",
            TopologyDiagnostic::CacheDomainNestingViolation { .. } => "cache-domain ids violate nesting",
            TopologyDiagnostic::FreqScalingEnabled { .. } => "frequency scaling is enabled",
            TopologyDiagnostic::SmtEnabled => "SMT is enabled",
            TopologyDiagnostic::AsymmetricTopology => "cores are not topologically symmetric",
            TopologyDiagnostic::NumaDistanceAsymmetric => "NUMA distance matrix is asymmetric",
        }
    }
}

impl core::fmt::Display for TopologyDiagnostic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
