//! Stage 2 of the seal chain: hardware geometry.
//!
//! [`Topology`] borrows a sealed [`crate::boot::SealedBootFacts`] and
//! derives per-core geometry, a precomputed cache-isolation matrix,
//! and NUMA node membership. The reference provider this crate ships
//! exposes only machine-wide facts (see [`crate::provider::ProbeProvider`]),
//! so per-core geometry here is *derived* from those facts under a
//! documented single-socket, homogeneous-hardware assumption: every
//! core has the same cache hierarchy and frequency envelope, and cores
//! are distributed across NUMA nodes in contiguous blocks. A richer
//! provider (reporting socket/package/NUMA placement directly per
//! core) would plug in without changing this module's public surface.

pub mod error;
pub mod geometry;
pub mod matrix;

pub use error::{TopologyDiagnostic, TopologyError};
pub use geometry::{
    CacheDomainIds, CoreCapabilities, CoreGeometry, CoreIdList, FrequencyInfo, NumaNodeInfo,
    SmtInfo, INVALID_ID,
};
pub use matrix::{CacheIsolationLevel, CacheIsolationMatrix};

use crate::boot::SealedBootFacts;
use crate::diagnostics::{Severity, ValidationContext};
use crate::limits::{MAX_CORES, MAX_NUMA_NODES};
use crate::provider::ProbeProvider;

/// Hardware geometry, pre-seal, borrowing its sealed predecessor.
///
/// Call order: [`init`](Self::init) → [`probe_all_cores`](Self::probe_all_cores)
/// (or per-core [`probe_core`](Self::probe_core)) →
/// [`build_cache_isolation_matrix`](Self::build_cache_isolation_matrix) →
/// [`validate`](Self::validate) → [`seal`](Self::seal).
pub struct Topology<'a> {
    boot: &'a SealedBootFacts,
    cores: [CoreGeometry; MAX_CORES],
    core_count: u32,
    numa_nodes: [NumaNodeInfo; MAX_NUMA_NODES],
    numa_node_count: u32,
    matrix: CacheIsolationMatrix,
    symmetric: bool,
    probed: bool,
    validated: bool,
}

impl<'a> Topology<'a> {
    /// Borrow `boot_facts` and size the geometry tables from its
    /// sealed `cpu_count`/`numa_node_count`.
    pub fn init(boot_facts: &'a SealedBootFacts) -> Result<Self, TopologyError> {
        if boot_facts.cpu_count() as usize > MAX_CORES {
            return Err(TopologyError::CapacityExceeded);
        }
        if boot_facts.numa_node_count() as usize > MAX_NUMA_NODES {
            return Err(TopologyError::CapacityExceeded);
        }

        let mut cores = [CoreGeometry::empty(0); MAX_CORES];
        for (i, core) in cores.iter_mut().enumerate() {
            *core = CoreGeometry::empty(i as u32);
        }
        let mut numa_nodes = [NumaNodeInfo::empty(0); MAX_NUMA_NODES];
        for (i, node) in numa_nodes.iter_mut().enumerate() {
            *node = NumaNodeInfo::empty(i as u32);
        }

        Ok(Self {
            boot: boot_facts,
            cores,
            core_count: boot_facts.cpu_count(),
            numa_nodes,
            numa_node_count: boot_facts.numa_node_count(),
            matrix: CacheIsolationMatrix::empty(),
            symmetric: true,
            probed: false,
            validated: false,
        })
    }

    /// Derive geometry for a single core from the sealed boot facts
    /// and the global frequency probes, and fold it into the owning
    /// NUMA node's membership.
    pub fn probe_core<P: ProbeProvider>(&mut self, provider: &P, core_id: u32) -> Result<(), TopologyError> {
        if core_id >= self.core_count {
            return Err(TopologyError::CoreIndexOutOfRange);
        }

        let geometry = self.derive_geometry(provider, core_id);
        let node_idx = geometry.numa_node as usize;
        self.cores[core_id as usize] = geometry;

        let node = &mut self.numa_nodes[node_idx];
        node.id = geometry.numa_node;
        node.memory_mb = (self.boot.total_memory_mb() / u64::from(self.numa_node_count.max(1))) as u32;
        node.cores.push(core_id);
        node.distance = geometry.numa_distance;
        node.validated = true;

        Ok(())
    }

    /// Probe every core `0 .. core_count`.
    pub fn probe_all_cores<P: ProbeProvider>(&mut self, provider: &P) -> Result<(), TopologyError> {
        for core_id in 0..self.core_count {
            self.probe_core(provider, core_id)?;
        }
        self.probed = true;
        log::info!("topology: {} core(s) probed across {} numa node(s)", self.core_count, self.numa_node_count);
        Ok(())
    }

    fn derive_geometry<P: ProbeProvider>(&self, provider: &P, core_id: u32) -> CoreGeometry {
        let cache = self.boot.cache_topology();
        let mut domains = CacheDomainIds::default();
        for level in cache.levels() {
            let domain_id = if level.shared { 0 } else { core_id + 1 };
            match level.level {
                1 => domains.l1 = domain_id,
                2 => domains.l2 = domain_id,
                3 => domains.l3 = domain_id,
                _ => {}
            }
        }

        let cores_per_node = self.core_count.div_ceil(self.numa_node_count.max(1));
        let numa_node = (core_id / cores_per_node.max(1)).min(self.numa_node_count.saturating_sub(1));

        let mut numa_distance = [0u32; MAX_NUMA_NODES];
        for (node, distance) in numa_distance.iter_mut().enumerate().take(self.numa_node_count as usize) {
            *distance = if node as u32 == numa_node { 10 } else { 20 };
        }

        let smt_enabled = self.boot.smt_enabled() && self.boot.threads_per_core() >= 2;
        let sibling_id = core_id ^ 1;
        let has_sibling = smt_enabled && sibling_id < self.core_count;

        CoreGeometry {
            physical_core: core_id,
            online: true,
            isolatable: true,
            socket_id: 0,
            package_id: 0,
            cache_domains: domains,
            cache_hierarchy: *cache,
            numa_node,
            numa_distance,
            smt: SmtInfo { has_sibling, sibling_id: if has_sibling { sibling_id } else { INVALID_ID } },
            frequency: FrequencyInfo {
                base_mhz: provider.probe_base_freq_mhz(),
                max_mhz: provider.probe_max_freq_mhz(),
                scaling_disabled: provider.probe_freq_scaling_disabled(),
            },
            capabilities: CoreCapabilities {
                constant_time: self.boot.constant_time_supported(),
                cache_partitioning: self.boot.cache_partitioning_supported(),
                memory_encryption: self.boot.memory_encryption_supported(),
            },
            probed: true,
        }
    }

    /// Compute the pairwise cache-isolation matrix from each core's
    /// derived cache-domain ids. Θ(N²) in the core count.
    pub fn build_cache_isolation_matrix(&mut self) {
        for a in 0..self.core_count {
            for b in a..self.core_count {
                let level = matrix::isolation_for(
                    self.cores[a as usize].cache_domains,
                    self.cores[b as usize].cache_domains,
                );
                self.matrix.set(a, b, level);
            }
        }
        self.matrix.set_computed();
        log::info!("topology: cache isolation matrix computed");
    }

    /// Evaluate the hard-fail / warn checklist and accumulate every
    /// finding into `ctx`. Returns the worst [`Severity`] seen.
    pub fn validate(&mut self, ctx: &mut ValidationContext<TopologyDiagnostic>) -> Severity {
        if self.core_count != self.boot.cpu_count() {
            ctx.record(
                Severity::HardFail,
                TopologyDiagnostic::CoreCountMismatch { expected: self.boot.cpu_count(), actual: self.core_count },
            );
        }

        for core_id in 0..self.core_count {
            let core = &self.cores[core_id as usize];
            if !core.probed {
                ctx.record(Severity::HardFail, TopologyDiagnostic::CoreNotProbed { core: core_id });
                continue;
            }
            if core.smt.has_sibling && core.smt.sibling_id >= self.core_count {
                ctx.record(
                    Severity::HardFail,
                    TopologyDiagnostic::SmtSiblingInvalid { core: core_id, sibling: core.smt.sibling_id },
                );
            }
            if !core.frequency.scaling_disabled {
                ctx.record(Severity::HardFail, TopologyDiagnostic::FreqScalingEnabled { core: core_id });
            }
        }

        for a in 0..self.core_count {
            for b in (a + 1)..self.core_count {
                let ca = self.cores[a as usize].cache_domains;
                let cb = self.cores[b as usize].cache_domains;
                let violates = (ca.l1 == cb.l1 && ca.l2 != cb.l2) || (ca.l2 == cb.l2 && ca.l3 != cb.l3);
                if violates {
                    ctx.record(Severity::HardFail, TopologyDiagnostic::CacheDomainNestingViolation { core_a: a, core_b: b });
                }
            }
        }

        if self.boot.smt_enabled() {
            ctx.record(Severity::Warn, TopologyDiagnostic::SmtEnabled);
        }

        self.symmetric = self.is_symmetric();
        if !self.symmetric {
            ctx.record(Severity::Warn, TopologyDiagnostic::AsymmetricTopology);
        }

        if !self.numa_distance_symmetric() {
            ctx.record(Severity::Warn, TopologyDiagnostic::NumaDistanceAsymmetric);
        }

        self.validated = ctx.worst().allows_boot();
        ctx.worst()
    }

    fn is_symmetric(&self) -> bool {
        if self.core_count == 0 {
            return true;
        }
        let reference = &self.cores[0];
        (1..self.core_count).all(|i| {
            let core = &self.cores[i as usize];
            core.frequency == reference.frequency && core.cache_hierarchy == reference.cache_hierarchy
        })
    }

    fn numa_distance_symmetric(&self) -> bool {
        for a in 0..self.numa_node_count as usize {
            for b in 0..self.numa_node_count as usize {
                if self.numa_nodes[a].distance[b] != self.numa_nodes[b].distance[a] {
                    return false;
                }
            }
        }
        true
    }

    /// Consume this record and seal it, provided validation accepted
    /// and the isolation matrix has been computed.
    pub fn seal(self) -> Result<SealedTopology<'a>, (Self, TopologyError)> {
        if !self.matrix.computed() {
            return Err((self, TopologyError::MatrixNotComputed));
        }
        if !self.validated {
            let err = TopologyError::ValidationFailed;
            return Err((self, err));
        }
        log::info!("topology: sealed");
        Ok(SealedTopology { topology: self })
    }

    /// Core geometry for `core_id`, if in range.
    #[must_use]
    pub fn core_geometry(&self, core_id: u32) -> Option<&CoreGeometry> {
        self.cores.get(core_id as usize).filter(|_| core_id < self.core_count)
    }

    /// Cache isolation level between two cores. `O(1)`.
    #[must_use]
    pub fn cache_isolation(&self, a: u32, b: u32) -> CacheIsolationLevel {
        self.matrix.get(a, b)
    }

    /// True iff `cache_isolation(a, b) >= required`.
    #[must_use]
    pub fn can_isolate(&self, a: u32, b: u32, required: CacheIsolationLevel) -> bool {
        self.matrix.get(a, b) >= required
    }

    /// True iff cores `a` and `b` are on the same NUMA node.
    #[must_use]
    pub fn same_numa(&self, a: u32, b: u32) -> bool {
        match (self.core_geometry(a), self.core_geometry(b)) {
            (Some(ca), Some(cb)) => ca.numa_node == cb.numa_node,
            _ => false,
        }
    }

    /// NUMA distance between the nodes hosting cores `a` and `b`.
    #[must_use]
    pub fn numa_distance(&self, a: u32, b: u32) -> u32 {
        let (Some(ca), Some(cb)) = (self.core_geometry(a), self.core_geometry(b)) else { return 0 };
        self.numa_nodes[ca.numa_node as usize].distance[cb.numa_node as usize]
    }

    /// True iff `core_id` has an SMT sibling.
    #[must_use]
    pub fn has_smt_sibling(&self, core_id: u32) -> bool {
        self.core_geometry(core_id).is_some_and(|c| c.smt.has_sibling)
    }

    /// Cores that share a cache domain with `core_id` at `level`
    /// (1..=3), including `core_id` itself.
    #[must_use]
    pub fn cache_sharing_cores(&self, core_id: u32, level: u8) -> CoreIdList {
        let mut out = CoreIdList::empty();
        let Some(target) = self.core_geometry(core_id) else { return out };
        let target_domain = match level {
            1 => target.cache_domains.l1,
            2 => target.cache_domains.l2,
            3 => target.cache_domains.l3,
            _ => return out,
        };
        for id in 0..self.core_count {
            let domain = match level {
                1 => self.cores[id as usize].cache_domains.l1,
                2 => self.cores[id as usize].cache_domains.l2,
                _ => self.cores[id as usize].cache_domains.l3,
            };
            if domain == target_domain {
                out.push(id);
            }
        }
        out
    }

    /// Number of cores this topology describes.
    #[must_use]
    pub const fn core_count(&self) -> u32 {
        self.core_count
    }

    /// Number of NUMA nodes this topology describes.
    #[must_use]
    pub const fn numa_node_count(&self) -> u32 {
        self.numa_node_count
    }

    /// NUMA node record by id.
    #[must_use]
    pub fn numa_node(&self, id: u32) -> Option<&NumaNodeInfo> {
        self.numa_nodes.get(id as usize).filter(|_| id < self.numa_node_count)
    }

    /// Whether every core is topologically identical (frequency and
    /// cache hierarchy).
    #[must_use]
    pub const fn is_symmetric_topology(&self) -> bool {
        self.symmetric
    }

    /// Whether `probe_all_cores` has completed.
    #[must_use]
    pub const fn is_probed(&self) -> bool {
        self.probed
    }

    /// Whether `validate` has accepted this topology.
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        self.validated
    }

    /// The sealed boot facts this topology was derived from.
    #[must_use]
    pub const fn boot_facts(&self) -> &SealedBootFacts {
        self.boot
    }
}

/// An immutable, sealed [`Topology`]. No mutators exist on this type.
pub struct SealedTopology<'a> {
    topology: Topology<'a>,
}

impl<'a> SealedTopology<'a> {
    /// Borrow the sealed topology.
    #[must_use]
    pub const fn topology(&self) -> &Topology<'a> {
        &self.topology
    }
}

impl<'a> core::ops::Deref for SealedTopology<'a> {
    type Target = Topology<'a>;

    fn deref(&self) -> &Topology<'a> {
        &self.topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::BootFacts;
    use crate::provider::scripted::ScriptedProvider;

    fn sealed_boot_facts(provider: &ScriptedProvider) -> SealedBootFacts {
        let mut facts = BootFacts::init();
        facts.probe(provider).expect("probe succeeds");
        let mut ctx = ValidationContext::new();
        facts.validate(&mut ctx);
        facts.seal().expect("boot facts seal")
    }

    #[test]
    fn minimal_fixture_probes_builds_matrix_and_seals() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);

        let mut topo = Topology::init(&boot).expect("init");
        topo.probe_all_cores(&provider).expect("probe all cores");
        topo.build_cache_isolation_matrix();

        let mut ctx = ValidationContext::new();
        let severity = topo.validate(&mut ctx);
        assert_eq!(severity, Severity::Accept, "{:?}", ctx.entries().collect::<std::vec::Vec<_>>());

        let sealed = topo.seal().expect("seal");
        // L3 is shared by all 4 cores, L1/L2 are private: cores 0 and 1
        // share only at L3, so their isolation level is L2 (private
        // L1/L2, shared L3 onward).
        assert_eq!(sealed.cache_isolation(0, 1), CacheIsolationLevel::L2);
        assert_eq!(sealed.cache_isolation(0, 0), CacheIsolationLevel::Full);
        assert!(sealed.can_isolate(0, 1, CacheIsolationLevel::L1));
        assert!(sealed.same_numa(0, 1));
    }

    #[test]
    fn seal_requires_matrix_computed() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let mut topo = Topology::init(&boot).expect("init");
        topo.probe_all_cores(&provider).expect("probe all cores");

        let mut ctx = ValidationContext::new();
        topo.validate(&mut ctx);
        let (_topo, err) = topo.seal().unwrap_err();
        assert_eq!(err, TopologyError::MatrixNotComputed);
    }

    #[test]
    fn freq_scaling_enabled_is_hard_fail() {
        let mut provider = ScriptedProvider::minimal_pass_fixture();
        provider.freq_scaling_disabled = false;
        let boot = sealed_boot_facts(&provider);
        let mut topo = Topology::init(&boot).expect("init");
        topo.probe_all_cores(&provider).expect("probe all cores");
        topo.build_cache_isolation_matrix();

        let mut ctx = ValidationContext::new();
        let severity = topo.validate(&mut ctx);
        assert_eq!(severity, Severity::HardFail);
        assert!(topo.seal().is_err());
    }

    #[test]
    fn cache_sharing_cores_includes_self_and_siblings() {
        let provider = ScriptedProvider::minimal_pass_fixture();
        let boot = sealed_boot_facts(&provider);
        let mut topo = Topology::init(&boot).expect("init");
        topo.probe_all_cores(&provider).expect("probe all cores");
        topo.build_cache_isolation_matrix();
        let mut ctx = ValidationContext::new();
        topo.validate(&mut ctx);

        let sharing_l3 = topo.cache_sharing_cores(0, 3);
        assert_eq!(sharing_l3.len(), 4);
        let sharing_l1 = topo.cache_sharing_cores(0, 1);
        assert_eq!(sharing_l1.len(), 1);
    }
}
