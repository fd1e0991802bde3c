//! Error types for the domain-graph stage.

use super::security_domain::DomainId;

/// Operational errors: precondition violations rather than declared
/// policy rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainError {
    /// `seal` was called before `validate` returned `Accept`/`Warn`.
    NotValidated,
    /// `seal` was called on a graph that already failed validation.
    ValidationFailed,
    /// `add` was called after `seal`.
    AlreadySealed,
    /// `add` was called with [`MAX_DOMAINS`](crate::limits::MAX_DOMAINS)
    /// domains already present.
    GraphFull,
    /// `add` was called with an id already present in the graph.
    DuplicateId {
        /// The colliding id.
        id: DomainId,
    },
    /// `with_dependency` was called with
    /// [`MAX_DEPENDENCIES`](crate::limits::MAX_DEPENDENCIES) dependencies
    /// already declared on the domain.
    DependencyCapacityExceeded {
        /// The domain that hit capacity.
        domain: DomainId,
    },
}

impl DomainError {
    /// Total, human-readable description of this error.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DomainError::NotValidated => "domain graph has not been validated",
            DomainError::ValidationFailed => "domain graph failed validation",
            DomainError::AlreadySealed => "domain graph is already sealed",
            DomainError::GraphFull => "domain graph is at capacity",
            DomainError::DuplicateId { .. } => "domain id already present in graph",
            DomainError::DependencyCapacityExceeded { .. } => "domain dependency set is at capacity",
        }
    }
}

impl core::fmt::Display for DomainError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostics produced by [`super::DomainGraph::validate`], grouped by
/// the composable validator that raises them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainDiagnostic {
    /// A domain's name was never explicitly set.
    NameNotSet {
        /// The offending domain.
        domain: DomainId,
    },
    /// A domain's cores were never explicitly set, or were set empty.
    CoresEmpty {
        /// The offending domain.
        domain: DomainId,
    },
    /// A domain's security level is `Undefined`.
    SecurityLevelUndefined {
        /// The offending domain.
        domain: DomainId,
    },
    /// A domain's cache isolation requirement is `Undefined`.
    CacheIsolationUndefined {
        /// The offending domain.
        domain: DomainId,
    },
    /// A domain's memory type is `Undefined`.
    MemoryTypeUndefined {
        /// The offending domain.
        domain: DomainId,
    },
    /// A domain's preemption policy is `Undefined`.
    PreemptionUndefined {
        /// The offending domain.
        domain: DomainId,
    },
    /// A domain's `numa_local` was never explicitly set.
    NumaLocalNotSet {
        /// The offending domain.
        domain: DomainId,
    },
    /// A domain claims a core id that does not exist in the sealed
    /// topology.
    CoreNotExist {
        /// The offending domain.
        domain: DomainId,
        /// The nonexistent core id.
        core: u32,
    },
    /// Two domains claim an overlapping core.
    CoresOverlap {
        /// First domain of the offending pair.
        domain_a: DomainId,
        /// Second domain of the offending pair.
        domain_b: DomainId,
        /// The shared core.
        core: u32,
    },
    /// A domain's declared cache isolation requirement cannot be met
    /// by the measured topology, for the named pair of its own cores.
    CacheIsolationUnsatisfiable {
        /// The offending domain.
        domain: DomainId,
        /// First core of the unsatisfiable pair.
        core_a: u32,
        /// Second core of the unsatisfiable pair.
        core_b: u32,
    },
    /// A domain requires NUMA-local memory but its cores span more
    /// than one NUMA node.
    NumaConstraintViolated {
        /// The offending domain.
        domain: DomainId,
    },
    /// A domain declares a dependency on a nonexistent domain id.
    DependencyNotExist {
        /// The offending domain.
        domain: DomainId,
        /// The nonexistent dependency id.
        dependency: DomainId,
    },
    /// A domain declares a dependency on itself.
    DependencySelf {
        /// The offending domain.
        domain: DomainId,
    },
    /// The dependency graph contains a cycle through this edge.
    DependencyCircular {
        /// Tail of the edge that closes the cycle.
        from: DomainId,
        /// Head of the edge that closes the cycle.
        to: DomainId,
    },
    /// Two domains at different security levels do not meet their
    /// combined cache isolation requirement against each other.
    CrossDomainCacheIsolationUnsatisfiable {
        /// First domain of the offending pair.
        domain_a: DomainId,
        /// Second domain of the offending pair.
        domain_b: DomainId,
    },
    /// A core present in the sealed topology is not claimed by any
    /// domain.
    UnusedCore {
        /// The unclaimed core.
        core: u32,
    },
}

impl DomainDiagnostic {
    /// Total, human-readable description of this diagnostic.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DomainDiagnostic::NameNotSet { .. } => "domain name was never set",
            DomainDiagnostic::CoresEmpty { .. } => "domain has no cores",
            DomainDiagnostic::SecurityLevelUndefined { .. } => "domain security level undefined",
            DomainDiagnostic::CacheIsolationUndefined { .. } => "domain cache isolation undefined",
            DomainDiagnostic::MemoryTypeUndefined { .. } => "domain memory type undefined",
            DomainDiagnostic::PreemptionUndefined { .. } => "domain preemption policy undefined",
            DomainDiagnostic::NumaLocalNotSet { .. } => "domain numa_local was never set",
            DomainDiagnostic::CoreNotExist { .. } => "domain claims a nonexistent core",
            DomainDiagnostic::CoresOverlap { .. } => "two domains claim the same core",
            DomainDiagnostic::CacheIsolationUnsatisfiable { .. } => {
                "declared cache isolation unsatisfiable by measured topology"
            }
            DomainDiagnostic::NumaConstraintViolated { .. } => "domain spans more than one NUMA node",
            DomainDiagnostic::DependencyNotExist { .. } => "dependency on a nonexistent domain",
            DomainDiagnostic::DependencySelf { .. } => "domain depends on itself",
            DomainDiagnostic::DependencyCircular { .. } => "circular dependency",
            DomainDiagnostic::CrossDomainCacheIsolationUnsatisfiable { .. } => {
                "cross-domain cache isolation unsatisfiable"
            }
            DomainDiagnostic::UnusedCore { .. } => "core unclaimed by any domain",
        }
    }
}

impl core::fmt::Display for DomainDiagnostic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
