//! Composable validators run in sequence by [`super::DomainGraph::validate`].
//!
//! Each validator is independent and non-short-circuiting: it records
//! every diagnostic it finds into the shared [`ValidationContext`]
//! rather than stopping at the first one. A validator that needs data
//! another validator also checks (e.g. "does this core exist") simply
//! re-derives it; none of them mutate graph state.

use crate::diagnostics::{Severity, ValidationContext};
use crate::limits::MAX_DOMAINS;
use crate::topology::SealedTopology;

use super::error::DomainDiagnostic;
use super::security_domain::SecurityDomain;

/// Every scalar/enum field must have been explicitly set, and `cores`
/// must be non-empty. This is the only validator that does not need
/// the topology: it is purely about whether the domain record itself
/// is complete.
pub fn validate_field_completeness(domains: &[SecurityDomain], ctx: &mut ValidationContext<DomainDiagnostic>) {
    for d in domains {
        if !d.name_explicit || d.name.is_empty() {
            ctx.record(Severity::HardFail, DomainDiagnostic::NameNotSet { domain: d.id });
        }
        if !d.cores.explicit || d.cores.is_empty() {
            ctx.record(Severity::HardFail, DomainDiagnostic::CoresEmpty { domain: d.id });
        }
        if d.security_level == super::security_domain::SecurityLevel::Undefined {
            ctx.record(Severity::HardFail, DomainDiagnostic::SecurityLevelUndefined { domain: d.id });
        }
        if d.cache_isolation == super::security_domain::CacheIsolationRequirement::Undefined {
            ctx.record(Severity::HardFail, DomainDiagnostic::CacheIsolationUndefined { domain: d.id });
        }
        if d.memory_type == super::security_domain::MemoryDomainType::Undefined {
            ctx.record(Severity::HardFail, DomainDiagnostic::MemoryTypeUndefined { domain: d.id });
        }
        if d.preemption == super::security_domain::PreemptionPolicy::Undefined {
            ctx.record(Severity::HardFail, DomainDiagnostic::PreemptionUndefined { domain: d.id });
        }
        if !d.numa_local_explicit {
            ctx.record(Severity::HardFail, DomainDiagnostic::NumaLocalNotSet { domain: d.id });
        }
    }
}

/// Every claimed core must exist in the sealed topology (this is the
/// graph's "boot consistency" check: a domain can only name cores the
/// machine actually booted with), every declared cache isolation
/// requirement must be satisfiable between the domain's own cores per
/// the measured isolation matrix, and a `numa_local` domain's cores
/// must all share one NUMA node.
pub fn validate_topology_satisfiability(
    domains: &[SecurityDomain],
    topology: &SealedTopology<'_>,
    ctx: &mut ValidationContext<DomainDiagnostic>,
) {
    for d in domains {
        let cores: core_collect::Collected = core_collect::collect(&d.cores);
        for &core in cores.as_slice() {
            if topology.core_geometry(core).is_none() {
                ctx.record(Severity::HardFail, DomainDiagnostic::CoreNotExist { domain: d.id, core });
            }
        }

        if let Some(required) = d.cache_isolation.as_topology_level() {
            for i in 0..cores.len() {
                for j in (i + 1)..cores.len() {
                    let (a, b) = (cores.as_slice()[i], cores.as_slice()[j]);
                    if !topology.can_isolate(a, b, required) {
                        ctx.record(
                            Severity::HardFail,
                            DomainDiagnostic::CacheIsolationUnsatisfiable { domain: d.id, core_a: a, core_b: b },
                        );
                    }
                }
            }
        }

        if d.numa_local_explicit && d.numa_local && cores.len() > 1 {
            let first = cores.as_slice()[0];
            let all_same = cores.as_slice()[1..].iter().all(|&c| topology.same_numa(first, c));
            if !all_same {
                ctx.record(Severity::HardFail, DomainDiagnostic::NumaConstraintViolated { domain: d.id });
            }
        }
    }
}

/// No two domains may claim the same core, and every core known to
/// the topology should be claimed by exactly one domain (unclaimed
/// cores are a warning, not a hard failure: an unassigned core simply
/// runs outside any declared security domain).
pub fn validate_global_disjointness(
    domains: &[SecurityDomain],
    topology: &SealedTopology<'_>,
    ctx: &mut ValidationContext<DomainDiagnostic>,
) {
    for i in 0..domains.len() {
        for j in (i + 1)..domains.len() {
            if domains[i].cores.overlaps(&domains[j].cores) {
                for core in domains[i].cores.iter() {
                    if domains[j].cores.contains(core) {
                        ctx.record(
                            Severity::HardFail,
                            DomainDiagnostic::CoresOverlap { domain_a: domains[i].id, domain_b: domains[j].id, core },
                        );
                    }
                }
            }
        }
    }

    for core in 0..topology.core_count() {
        let claimed = domains.iter().any(|d| d.cores.contains(core));
        if !claimed {
            ctx.record(Severity::Warn, DomainDiagnostic::UnusedCore { core });
        }
    }
}

/// Every declared dependency must name a domain id present in the
/// graph, and a domain may not depend on itself.
pub fn validate_dependency_existence(domains: &[SecurityDomain], ctx: &mut ValidationContext<DomainDiagnostic>) {
    for d in domains {
        for &dep in d.dependencies.as_slice() {
            if dep == d.id {
                ctx.record(Severity::HardFail, DomainDiagnostic::DependencySelf { domain: d.id });
                continue;
            }
            if !domains.iter().any(|other| other.id == dep) {
                ctx.record(Severity::HardFail, DomainDiagnostic::DependencyNotExist { domain: d.id, dependency: dep });
            }
        }
    }
}

/// The dependency graph must be acyclic. Iterative DFS with
/// white/gray/black coloring: a back edge into a gray node is a
/// cycle. Unresolvable dependency ids are left to
/// [`validate_dependency_existence`]; this pass simply skips edges it
/// cannot follow.
pub fn validate_acyclicity(domains: &[SecurityDomain], ctx: &mut ValidationContext<DomainDiagnostic>) {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let n = domains.len();
    let mut color = [Color::White; MAX_DOMAINS];
    let mut stack = [(0usize, 0usize); MAX_DOMAINS];

    for start in 0..n {
        if color[start] != Color::White {
            continue;
        }
        let mut sp = 1usize;
        stack[0] = (start, 0);
        color[start] = Color::Gray;

        while sp > 0 {
            let (node, edge_idx) = stack[sp - 1];
            let deps = domains[node].dependencies.as_slice();
            if edge_idx < deps.len() {
                stack[sp - 1].1 += 1;
                let dep_id = deps[edge_idx];
                if let Some(next) = domains.iter().position(|d| d.id == dep_id) {
                    match color[next] {
                        Color::White => {
                            color[next] = Color::Gray;
                            if sp < MAX_DOMAINS {
                                stack[sp] = (next, 0);
                                sp += 1;
                            }
                        }
                        Color::Gray => {
                            ctx.record(
                                Severity::HardFail,
                                DomainDiagnostic::DependencyCircular { from: domains[node].id, to: dep_id },
                            );
                        }
                        Color::Black => {}
                    }
                }
            } else {
                color[node] = Color::Black;
                sp -= 1;
            }
        }
    }
}

/// Domains at different security levels must be isolated from each
/// other at the stricter of their two declared cache isolation
/// requirements. Unlike [`validate_topology_satisfiability`] (which
/// checks a domain's own cores against each other), this checks every
/// cross-domain core pair. Hard-fails rather than warns: cache sharing
/// across a security-level boundary is exactly the trust-boundary
/// violation this graph exists to prevent.
pub fn validate_cross_domain_cache_isolation(
    domains: &[SecurityDomain],
    topology: &SealedTopology<'_>,
    ctx: &mut ValidationContext<DomainDiagnostic>,
) {
    for i in 0..domains.len() {
        for j in (i + 1)..domains.len() {
            let (da, db) = (&domains[i], &domains[j]);
            if da.security_level == db.security_level {
                continue;
            }
            let (Some(la), Some(lb)) = (da.cache_isolation.as_topology_level(), db.cache_isolation.as_topology_level())
            else {
                continue;
            };
            let required = la.max(lb);

            let mut violated = false;
            'outer: for core_a in da.cores.iter() {
                for core_b in db.cores.iter() {
                    if !topology.can_isolate(core_a, core_b, required) {
                        violated = true;
                        break 'outer;
                    }
                }
            }
            if violated {
                ctx.record(
                    Severity::HardFail,
                    DomainDiagnostic::CrossDomainCacheIsolationUnsatisfiable { domain_a: da.id, domain_b: db.id },
                );
            }
        }
    }
}

/// A tiny stack-allocated collector for a domain's member core ids,
/// used only inside this module to iterate `CoreSet` twice without
/// re-walking the bitmap search each time.
mod core_collect {
    use crate::limits::MAX_DOMAIN_CORES;
    use crate::domain::security_domain::CoreSet;

    pub struct Collected {
        ids: [u32; MAX_DOMAIN_CORES],
        count: usize,
    }

    impl Collected {
        pub fn as_slice(&self) -> &[u32] {
            &self.ids[..self.count]
        }

        pub fn len(&self) -> usize {
            self.count
        }
    }

    pub fn collect(set: &CoreSet) -> Collected {
        let mut ids = [0u32; MAX_DOMAIN_CORES];
        let mut count = 0;
        for core in set.iter() {
            ids[count] = core;
            count += 1;
        }
        Collected { ids, count }
    }
}
