//! End-to-end exercises of the full `ProbeProvider -> BootFacts ->
//! Topology -> DomainGraph` seal chain, against the scripted provider.
//!
//! Each test below is one of the concrete scenarios the three-stage
//! pipeline is expected to produce a specific, literal result for.

use bootseal::boot::{BootFacts, SealedBootFacts};
use bootseal::diagnostics::{Severity, ValidationContext};
use bootseal::domain::{
    CacheIsolationRequirement, DomainDiagnostic, DomainGraph, MemoryDomainType, PreemptionPolicy,
    SecurityDomain, SecurityLevel,
};
use bootseal::provider::scripted::ScriptedProvider;
use bootseal::topology::{CacheIsolationLevel, SealedTopology, Topology, TopologyDiagnostic};

fn seal_boot(provider: &ScriptedProvider) -> SealedBootFacts {
    let mut facts = BootFacts::init();
    facts.probe(provider).expect("probe succeeds");
    let mut ctx = ValidationContext::new();
    facts.validate(&mut ctx);
    facts.seal().expect("boot facts seal")
}

fn seal_topology<'a>(provider: &ScriptedProvider, boot: &'a SealedBootFacts) -> SealedTopology<'a> {
    let mut topo = Topology::init(boot).expect("topology init");
    topo.probe_all_cores(provider).expect("probe all cores");
    topo.build_cache_isolation_matrix();
    let mut ctx = ValidationContext::new();
    topo.validate(&mut ctx);
    topo.seal().expect("topology seal")
}

#[test]
fn scenario_1_minimal_pass() {
    let provider = ScriptedProvider::minimal_pass_fixture();
    let boot = seal_boot(&provider);
    let topo = seal_topology(&provider, &boot);

    let mut graph = DomainGraph::init(&topo);
    let boot_domain = SecurityDomain::empty(0)
        .with_name(b"boot")
        .with_security_level(SecurityLevel::L0)
        .with_preemption(PreemptionPolicy::ByAny)
        .with_core(0)
        .with_core(1)
        .with_core(2)
        .with_core(3)
        .with_cache_isolation(CacheIsolationRequirement::L2)
        .with_memory_type(MemoryDomainType::SharedWrite)
        .with_numa_local(true);
    graph.add(boot_domain).expect("add boot domain");

    let mut ctx = ValidationContext::new();
    let severity = graph.validate(&mut ctx);
    assert_eq!(severity, Severity::Accept, "{:?}", ctx.entries().collect::<Vec<_>>());

    let sealed = graph.seal().expect("domain graph seals");
    assert_eq!(sealed.topology().cache_isolation(0, 1), CacheIsolationLevel::L2);
}

#[test]
fn scenario_2_topology_rejects_isolation() {
    let provider = ScriptedProvider::minimal_pass_fixture();
    let boot = seal_boot(&provider);
    let topo = seal_topology(&provider, &boot);

    let mut graph = DomainGraph::init(&topo);
    let domain = SecurityDomain::empty(0)
        .with_name(b"strict")
        .with_security_level(SecurityLevel::L4)
        .with_preemption(PreemptionPolicy::Never)
        .with_core(0)
        .with_core(1)
        .with_cache_isolation(CacheIsolationRequirement::L3)
        .with_memory_type(MemoryDomainType::Isolated)
        .with_numa_local(true);
    graph.add(domain).expect("add domain");

    let mut ctx = ValidationContext::new();
    let severity = graph.validate(&mut ctx);
    assert_eq!(severity, Severity::HardFail);
    assert!(ctx
        .entries()
        .any(|d| matches!(d, DomainDiagnostic::CacheIsolationUnsatisfiable { core_a: 0, core_b: 1, .. })));
    assert!(graph.seal().is_err());
}

#[test]
fn scenario_3_core_overlap() {
    let provider = ScriptedProvider::minimal_pass_fixture();
    let boot = seal_boot(&provider);
    let topo = seal_topology(&provider, &boot);

    let base = |id, cores: &[u32]| {
        let mut d = SecurityDomain::empty(id)
            .with_name(b"d")
            .with_security_level(SecurityLevel::L2)
            .with_preemption(PreemptionPolicy::BySame)
            .with_cache_isolation(CacheIsolationRequirement::None)
            .with_memory_type(MemoryDomainType::Isolated)
            .with_numa_local(false);
        for &c in cores {
            d = d.with_core(c);
        }
        d
    };

    let mut graph = DomainGraph::init(&topo);
    graph.add(base(0, &[0, 1])).expect("add 0");
    graph.add(base(1, &[1, 2])).expect("add 1");

    let mut ctx = ValidationContext::new();
    let severity = graph.validate(&mut ctx);
    assert_eq!(severity, Severity::HardFail);
    assert!(ctx
        .entries()
        .any(|d| matches!(d, DomainDiagnostic::CoresOverlap { domain_a: 0, domain_b: 1, core: 1 })));
    assert!(graph.seal().is_err());
}

#[test]
fn scenario_4_dependency_cycle() {
    let provider = ScriptedProvider::minimal_pass_fixture();
    let boot = seal_boot(&provider);
    let topo = seal_topology(&provider, &boot);

    let base = |id, cores: &[u32], dep| {
        let mut d = SecurityDomain::empty(id)
            .with_name(b"d")
            .with_security_level(SecurityLevel::L2)
            .with_preemption(PreemptionPolicy::BySame)
            .with_cache_isolation(CacheIsolationRequirement::None)
            .with_memory_type(MemoryDomainType::Isolated)
            .with_numa_local(false)
            .with_dependency(dep)
            .expect("dependency capacity");
        for &c in cores {
            d = d.with_core(c);
        }
        d
    };

    let mut graph = DomainGraph::init(&topo);
    graph.add(base(0, &[0], 1)).expect("add A");
    graph.add(base(1, &[1], 2)).expect("add B");
    graph.add(base(2, &[2, 3], 0)).expect("add C");

    let mut ctx = ValidationContext::new();
    let severity = graph.validate(&mut ctx);
    assert_eq!(severity, Severity::HardFail);
    assert!(ctx.entries().any(|d| matches!(d, DomainDiagnostic::DependencyCircular { .. })));
    assert!(graph.seal().is_err());
}

#[test]
fn scenario_5_missing_explicit_reports_alongside_other_errors() {
    let provider = ScriptedProvider::minimal_pass_fixture();
    let boot = seal_boot(&provider);
    let topo = seal_topology(&provider, &boot);

    let mut graph = DomainGraph::init(&topo);
    // Everything set except memory_type, and cores overlap with nothing
    // (single domain) — but we also leave out numa_local to show two
    // independent field-completeness errors surface together.
    let domain = SecurityDomain::empty(0)
        .with_name(b"incomplete")
        .with_security_level(SecurityLevel::L2)
        .with_preemption(PreemptionPolicy::BySame)
        .with_core(0)
        .with_cache_isolation(CacheIsolationRequirement::None);
    graph.add(domain).expect("add");

    let mut ctx = ValidationContext::new();
    let severity = graph.validate(&mut ctx);
    assert_eq!(severity, Severity::HardFail);
    assert!(ctx.entries().any(|d| matches!(d, DomainDiagnostic::MemoryTypeUndefined { domain: 0 })));
    assert!(ctx.entries().any(|d| matches!(d, DomainDiagnostic::NumaLocalNotSet { domain: 0 })));
}

#[test]
fn scenario_6_warn_only_smt_and_secure_boot() {
    let mut provider = ScriptedProvider::minimal_pass_fixture();
    provider.smt_enabled = true;
    provider.threads_per_core = 2;
    provider.boot_mode.secure_boot = false;

    let boot = seal_boot(&provider);
    let mut topo = Topology::init(&boot).expect("topology init");
    topo.probe_all_cores(&provider).expect("probe all cores");
    topo.build_cache_isolation_matrix();
    let mut topo_ctx = ValidationContext::<TopologyDiagnostic>::new();
    let topo_severity = topo.validate(&mut topo_ctx);
    assert_eq!(topo_severity, Severity::Warn);
    assert!(topo_ctx.entries().any(|d| matches!(d, TopologyDiagnostic::SmtEnabled)));
    let sealed_topo = topo.seal().expect("topology seals with warnings");

    let mut graph = DomainGraph::init(&sealed_topo);
    let domain = SecurityDomain::empty(0)
        .with_name(b"boot")
        .with_security_level(SecurityLevel::L0)
        .with_preemption(PreemptionPolicy::ByAny)
        .with_core(0)
        .with_core(1)
        .with_core(2)
        .with_core(3)
        .with_cache_isolation(CacheIsolationRequirement::None)
        .with_memory_type(MemoryDomainType::SharedWrite)
        .with_numa_local(true);
    graph.add(domain).expect("add");

    let mut ctx = ValidationContext::new();
    let severity = graph.validate(&mut ctx);
    assert_eq!(severity, Severity::Accept);
    assert!(graph.seal().is_ok());
}

#[test]
fn property_p3_matrix_symmetry_and_trivial_diagonal() {
    let provider = ScriptedProvider::minimal_pass_fixture();
    let boot = seal_boot(&provider);
    let topo = seal_topology(&provider, &boot);

    for a in 0..topo.core_count() {
        for b in 0..topo.core_count() {
            assert_eq!(topo.cache_isolation(a, b), topo.cache_isolation(b, a));
        }
        assert_eq!(topo.cache_isolation(a, a), CacheIsolationLevel::Full);
    }
}

#[test]
fn property_p4_cache_domain_nesting_violation_is_hard_fail() {
    let mut provider = ScriptedProvider::minimal_pass_fixture();
    // L1 reported shared across all cores, but L2 reported private per
    // core: two cores that share an L1 domain id must also share every
    // coarser level, so this must surface as a nesting violation.
    provider.cache_levels[0].as_mut().unwrap().shared = true;

    let boot = seal_boot(&provider);
    let mut topo = Topology::init(&boot).expect("topology init");
    topo.probe_all_cores(&provider).expect("probe all cores");
    topo.build_cache_isolation_matrix();
    let mut ctx = ValidationContext::<TopologyDiagnostic>::new();
    let severity = topo.validate(&mut ctx);
    assert_eq!(severity, Severity::HardFail);
    assert!(ctx.entries().any(|d| matches!(d, TopologyDiagnostic::CacheDomainNestingViolation { .. })));
}

#[test]
fn property_p8_isolation_witness_holds_after_accept() {
    let provider = ScriptedProvider::minimal_pass_fixture();
    let boot = seal_boot(&provider);
    let topo = seal_topology(&provider, &boot);

    let mut graph = DomainGraph::init(&topo);
    graph
        .add(
            SecurityDomain::empty(0)
                .with_name(b"a")
                .with_security_level(SecurityLevel::L1)
                .with_preemption(PreemptionPolicy::BySame)
                .with_core(0)
                .with_core(1)
                .with_cache_isolation(CacheIsolationRequirement::L2)
                .with_memory_type(MemoryDomainType::Isolated)
                .with_numa_local(true),
        )
        .expect("add a");
    graph
        .add(
            SecurityDomain::empty(1)
                .with_name(b"b")
                .with_security_level(SecurityLevel::L1)
                .with_preemption(PreemptionPolicy::BySame)
                .with_core(2)
                .with_core(3)
                .with_cache_isolation(CacheIsolationRequirement::None)
                .with_memory_type(MemoryDomainType::Isolated)
                .with_numa_local(true),
        )
        .expect("add b");

    let mut ctx = ValidationContext::new();
    let severity = graph.validate(&mut ctx);
    assert_eq!(severity, Severity::Accept, "{:?}", ctx.entries().collect::<Vec<_>>());
    let sealed = graph.seal().expect("seal");

    for id in [0u32, 1u32] {
        let domain = sealed.get(id).unwrap();
        let required = domain.cache_isolation.as_topology_level().unwrap();
        let cores: Vec<u32> = domain.cores.iter().collect();
        for i in 0..cores.len() {
            for j in (i + 1)..cores.len() {
                assert!(sealed.topology().cache_isolation(cores[i], cores[j]) >= required);
            }
        }
    }
}

#[test]
fn property_p6_any_single_missing_field_is_hard_fail() {
    let provider = ScriptedProvider::minimal_pass_fixture();
    let boot = seal_boot(&provider);
    let topo = seal_topology(&provider, &boot);

    let mut graph = DomainGraph::init(&topo);
    // security_level left Undefined; everything else set.
    let domain = SecurityDomain::empty(0)
        .with_name(b"partial")
        .with_preemption(PreemptionPolicy::BySame)
        .with_core(0)
        .with_cache_isolation(CacheIsolationRequirement::None)
        .with_memory_type(MemoryDomainType::Isolated)
        .with_numa_local(false);
    graph.add(domain).expect("add");

    let mut ctx = ValidationContext::new();
    let severity = graph.validate(&mut ctx);
    assert_eq!(severity, Severity::HardFail);
    assert!(ctx.entries().any(|d| matches!(d, DomainDiagnostic::SecurityLevelUndefined { domain: 0 })));
}
