//! Stage 3 of the seal chain: the security domain graph.
//!
//! A [`DomainGraph`] partitions the cores described by a sealed
//! [`crate::topology::SealedTopology`] into named security domains and
//! checks that the partition is internally consistent and satisfiable
//! by the measured hardware. Call order mirrors the earlier two
//! stages: [`init`](DomainGraph::init) → repeated
//! [`add`](DomainGraph::add) → [`validate`](DomainGraph::validate) →
//! [`seal`](DomainGraph::seal).

pub mod error;
pub mod security_domain;
mod validators;

pub use error::{DomainDiagnostic, DomainError};
pub use security_domain::{
    CacheIsolationRequirement, CoreSet, DependencySet, DomainId, DomainName, MemoryDomainType,
    PreemptionPolicy, SecurityDomain, SecurityLevel, DOMAIN_ID_BOOT, DOMAIN_ID_INVALID,
};

use crate::diagnostics::{Severity, ValidationContext};
use crate::limits::MAX_DOMAINS;
use crate::topology::SealedTopology;

/// A set of security domains over a sealed topology, pre-seal.
pub struct DomainGraph<'a> {
    topology: &'a SealedTopology<'a>,
    domains: [SecurityDomain; MAX_DOMAINS],
    domain_count: usize,
    validated: bool,
}

impl<'a> DomainGraph<'a> {
    /// An empty graph over `topology`.
    #[must_use]
    pub fn init(topology: &'a SealedTopology<'a>) -> Self {
        Self {
            topology,
            domains: [SecurityDomain::empty(DOMAIN_ID_INVALID); MAX_DOMAINS],
            domain_count: 0,
            validated: false,
        }
    }

    /// Add a domain. No validation is performed here; `domain` may be
    /// arbitrarily incomplete until [`validate`](Self::validate) runs.
    pub fn add(&mut self, domain: SecurityDomain) -> Result<(), DomainError> {
        if self.domain_count >= MAX_DOMAINS {
            return Err(DomainError::GraphFull);
        }
        if self.domains[..self.domain_count].iter().any(|d| d.id == domain.id) {
            return Err(DomainError::DuplicateId { id: domain.id });
        }
        self.domains[self.domain_count] = domain;
        self.domain_count += 1;
        Ok(())
    }

    /// Run every composable validator and accumulate every finding
    /// into `ctx`. Returns the worst [`Severity`] seen.
    pub fn validate(&mut self, ctx: &mut ValidationContext<DomainDiagnostic>) -> Severity {
        let domains = &self.domains[..self.domain_count];

        validators::validate_field_completeness(domains, ctx);
        validators::validate_topology_satisfiability(domains, self.topology, ctx);
        validators::validate_global_disjointness(domains, self.topology, ctx);
        validators::validate_dependency_existence(domains, ctx);
        validators::validate_acyclicity(domains, ctx);
        validators::validate_cross_domain_cache_isolation(domains, self.topology, ctx);

        self.validated = ctx.worst().allows_boot();
        log::info!("domain graph: {} domain(s) validated, worst={:?}", self.domain_count, ctx.worst());
        ctx.worst()
    }

    /// Consume this graph and seal it, provided `validate` accepted.
    pub fn seal(self) -> Result<SealedDomainGraph<'a>, (Self, DomainError)> {
        if !self.validated {
            let err = DomainError::ValidationFailed;
            return Err((self, err));
        }
        log::info!("domain graph: sealed");
        Ok(SealedDomainGraph { graph: self })
    }

    /// The domain with `id`, if present.
    #[must_use]
    pub fn get(&self, id: DomainId) -> Option<&SecurityDomain> {
        self.domains[..self.domain_count].iter().find(|d| d.id == id)
    }

    /// True iff `to` is reachable from `from` by following declared
    /// dependency edges (transitive closure). A domain can always
    /// reach itself.
    #[must_use]
    pub fn can_access(&self, from: DomainId, to: DomainId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = [false; MAX_DOMAINS];
        let mut stack = [0u32; MAX_DOMAINS];
        let mut sp = 0usize;

        stack[sp] = from;
        sp += 1;

        while sp > 0 {
            sp -= 1;
            let current = stack[sp];
            let Some(idx) = self.domains[..self.domain_count].iter().position(|d| d.id == current) else {
                continue;
            };
            if visited[idx] {
                continue;
            }
            visited[idx] = true;

            for &dep in self.domains[idx].dependencies.as_slice() {
                if dep == to {
                    return true;
                }
                if sp < MAX_DOMAINS {
                    stack[sp] = dep;
                    sp += 1;
                }
            }
        }
        false
    }

    /// True iff every cross-pair of cores between domains `a` and `b`
    /// satisfies both domains' declared cache isolation requirements.
    #[must_use]
    pub fn cores_isolated(&self, a: DomainId, b: DomainId) -> bool {
        let (Some(da), Some(db)) = (self.get(a), self.get(b)) else { return false };
        let (Some(la), Some(lb)) = (da.cache_isolation.as_topology_level(), db.cache_isolation.as_topology_level())
        else {
            return false;
        };
        let required = la.max(lb);
        for core_a in da.cores.iter() {
            for core_b in db.cores.iter() {
                if !self.topology.can_isolate(core_a, core_b, required) {
                    return false;
                }
            }
        }
        true
    }

    /// The sealed topology this graph was built over.
    #[must_use]
    pub const fn topology(&self) -> &SealedTopology<'a> {
        self.topology
    }

    /// Number of domains currently in the graph.
    #[must_use]
    pub const fn domain_count(&self) -> usize {
        self.domain_count
    }

    /// Whether `validate` has accepted this graph.
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        self.validated
    }
}

/// An immutable, sealed [`DomainGraph`]. No mutators exist on this type.
pub struct SealedDomainGraph<'a> {
    graph: DomainGraph<'a>,
}

impl<'a> SealedDomainGraph<'a> {
    /// Borrow the sealed graph.
    #[must_use]
    pub const fn graph(&self) -> &DomainGraph<'a> {
        &self.graph
    }
}

impl<'a> core::ops::Deref for SealedDomainGraph<'a> {
    type Target = DomainGraph<'a>;

    fn deref(&self) -> &DomainGraph<'a> {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::{BootFacts, SealedBootFacts};
    use crate::provider::scripted::ScriptedProvider;
    use crate::topology::Topology;

    fn sealed_boot_facts(provider: &ScriptedProvider) -> SealedBootFacts {
        let mut facts = BootFacts::init();
        facts.probe(provider).expect("probe succeeds");
        let mut ctx = ValidationContext::new();
        facts.validate(&mut ctx);
        facts.seal().expect("boot facts seal")
    }

    fn sealed_topology(provider: &ScriptedProvider, boot: &SealedBootFacts) -> SealedTopology<'_> {
        let mut topo = Topology::init(boot).expect("topology init");
        topo.probe_all_cores(provider).expect("probe all cores");
        topo.build_cache_isolation_matrix();
        let mut ctx = ValidationContext::new();
        topo.validate(&mut ctx);
        topo.seal().expect("topology seal")
    }

    fn complete_domain(id: DomainId, cores: &[u32]) -> SecurityDomain {
        let mut domain = SecurityDomain::empty(id)
            .with_name(b"test-domain")
            .with_security_level(SecurityLevel::L3)
            .with_preemption(PreemptionPolicy::ByHigher)
            .with_cache_isolation(CacheIsolationRequirement::L1)
            .with_memory_type(MemoryDomainType::Isolated)
            .with_numa_local(true);
        for &c in cores {
            domain = domain.with_core(c);
        }
        domain
    }

    #[test]
    fn minimal_two_domain_split_validates_clean() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let topo = sealed_topology(&provider, &boot);

        let mut graph = DomainGraph::init(&topo);
        graph.add(complete_domain(0, &[0, 1])).expect("add domain 0");
        graph.add(complete_domain(1, &[2, 3])).expect("add domain 1");

        let mut ctx = ValidationContext::new();
        let severity = graph.validate(&mut ctx);
        assert_eq!(severity, Severity::Accept, "{:?}", ctx.entries().collect::<std::vec::Vec<_>>());

        let sealed = graph.seal().expect("seal");
        assert!(sealed.cores_isolated(0, 1) || sealed.get(0).unwrap().security_level == sealed.get(1).unwrap().security_level);
    }

    #[test]
    fn incomplete_domain_is_hard_fail() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let topo = sealed_topology(&provider, &boot);

        let mut graph = DomainGraph::init(&topo);
        graph.add(SecurityDomain::empty(0).with_core(0)).expect("add");

        let mut ctx = ValidationContext::new();
        let severity = graph.validate(&mut ctx);
        assert_eq!(severity, Severity::HardFail);
        assert!(ctx.entries().any(|d| matches!(d, DomainDiagnostic::NameNotSet { domain: 0 })));
        assert!(ctx.entries().any(|d| matches!(d, DomainDiagnostic::SecurityLevelUndefined { domain: 0 })));
    }

    #[test]
    fn overlapping_cores_is_hard_fail() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let topo = sealed_topology(&provider, &boot);

        let mut graph = DomainGraph::init(&topo);
        graph.add(complete_domain(0, &[0, 1])).expect("add domain 0");
        graph.add(complete_domain(1, &[1, 2])).expect("add domain 1");

        let mut ctx = ValidationContext::new();
        let severity = graph.validate(&mut ctx);
        assert_eq!(severity, Severity::HardFail);
        assert!(ctx.entries().any(|d| matches!(d, DomainDiagnostic::CoresOverlap { core: 1, .. })));
    }

    #[test]
    fn unsatisfiable_cache_isolation_is_hard_fail() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let topo = sealed_topology(&provider, &boot);

        let mut graph = DomainGraph::init(&topo);
        let domain = complete_domain(0, &[0, 1]).with_cache_isolation(CacheIsolationRequirement::L3);
        graph.add(domain).expect("add");

        let mut ctx = ValidationContext::new();
        let severity = graph.validate(&mut ctx);
        assert_eq!(severity, Severity::HardFail);
        assert!(ctx
            .entries()
            .any(|d| matches!(d, DomainDiagnostic::CacheIsolationUnsatisfiable { domain: 0, .. })));
    }

    #[test]
    fn self_dependency_is_hard_fail() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let topo = sealed_topology(&provider, &boot);

        let mut graph = DomainGraph::init(&topo);
        let domain = complete_domain(0, &[0, 1]).with_dependency(0).expect("dependency capacity");
        graph.add(domain).expect("add");

        let mut ctx = ValidationContext::new();
        let severity = graph.validate(&mut ctx);
        assert_eq!(severity, Severity::HardFail);
        assert!(ctx.entries().any(|d| matches!(d, DomainDiagnostic::DependencySelf { domain: 0 })));
    }

    #[test]
    fn two_cycle_dependency_is_hard_fail() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let topo = sealed_topology(&provider, &boot);

        let mut graph = DomainGraph::init(&topo);
        graph.add(complete_domain(0, &[0, 1]).with_dependency(1).expect("dependency capacity")).expect("add 0");
        graph.add(complete_domain(1, &[2, 3]).with_dependency(0).expect("dependency capacity")).expect("add 1");

        let mut ctx = ValidationContext::new();
        let severity = graph.validate(&mut ctx);
        assert_eq!(severity, Severity::HardFail);
        assert!(ctx.entries().any(|d| matches!(d, DomainDiagnostic::DependencyCircular { .. })));
    }

    #[test]
    fn missing_dependency_is_hard_fail() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let topo = sealed_topology(&provider, &boot);

        let mut graph = DomainGraph::init(&topo);
        graph.add(complete_domain(0, &[0, 1]).with_dependency(99).expect("dependency capacity")).expect("add");

        let mut ctx = ValidationContext::new();
        let severity = graph.validate(&mut ctx);
        assert_eq!(severity, Severity::HardFail);
        assert!(ctx
            .entries()
            .any(|d| matches!(d, DomainDiagnostic::DependencyNotExist { domain: 0, dependency: 99 })));
    }

    #[test]
    fn can_access_follows_transitive_dependencies() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let topo = sealed_topology(&provider, &boot);

        let mut graph = DomainGraph::init(&topo);
        graph.add(complete_domain(0, &[0]).with_dependency(1).expect("dependency capacity")).expect("add 0");
        graph.add(complete_domain(1, &[1]).with_dependency(2).expect("dependency capacity")).expect("add 1");
        graph.add(complete_domain(2, &[2, 3])).expect("add 2");

        assert!(graph.can_access(0, 1));
        assert!(graph.can_access(0, 2));
        assert!(!graph.can_access(2, 0));
    }

    #[test]
    fn unused_core_is_warning_not_hard_fail() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let topo = sealed_topology(&provider, &boot);

        let mut graph = DomainGraph::init(&topo);
        graph.add(complete_domain(0, &[0, 1, 2])).expect("add");

        let mut ctx = ValidationContext::new();
        let severity = graph.validate(&mut ctx);
        assert_eq!(severity, Severity::Warn);
        assert!(ctx.entries().any(|d| matches!(d, DomainDiagnostic::UnusedCore { core: 3 })));
    }

    #[test]
    fn duplicate_id_is_rejected_at_add_time() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let topo = sealed_topology(&provider, &boot);

        let mut graph = DomainGraph::init(&topo);
        graph.add(complete_domain(0, &[0])).expect("add first");
        let err = graph.add(complete_domain(0, &[1])).unwrap_err();
        assert_eq!(err, DomainError::DuplicateId { id: 0 });
    }
}
