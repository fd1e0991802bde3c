//! Per-core and per-NUMA-node geometry types.

use crate::boot::facts::CacheTopology;
use crate::limits::{MAX_CORES, MAX_NUMA_NODES};

/// Sentinel for "no such core/node".
pub const INVALID_ID: u32 = 0xFFFF_FFFF;

/// Cache-domain identifiers at each of the three named levels. Two
/// cores share a domain at a level iff their ids at that level are
/// equal; by the nesting invariant, sharing at level *k* implies
/// sharing at every level *m* > *k*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheDomainIds {
    /// L1 domain id.
    pub l1: u32,
    /// L2 domain id.
    pub l2: u32,
    /// L3 domain id.
    pub l3: u32,
}

/// SMT sibling relationship for one core.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtInfo {
    /// Whether this core shares execution resources with another.
    pub has_sibling: bool,
    /// The sibling core id, or [`INVALID_ID`] if `has_sibling` is false.
    pub sibling_id: u32,
}

/// Operating-frequency facts, required for the determinism guarantee:
/// `scaling_disabled` must be true on every online core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrequencyInfo {
    /// Base (guaranteed) frequency in MHz.
    pub base_mhz: u32,
    /// Maximum (turbo) frequency in MHz.
    pub max_mhz: u32,
    /// Whether dynamic frequency scaling is disabled.
    pub scaling_disabled: bool,
}

/// Security-relevant capabilities rolled up from boot facts onto each
/// core (uniform across cores on the homogeneous machines this crate
/// targets).
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreCapabilities {
    /// Constant-time instruction support.
    pub constant_time: bool,
    /// Cache partitioning (CAT) support.
    pub cache_partitioning: bool,
    /// Memory encryption (TME) support.
    pub memory_encryption: bool,
}

/// Physical geometry of a single core. Every field is a measured (or,
/// where noted, derived) fact, never a policy decision.
#[derive(Debug, Clone, Copy)]
pub struct CoreGeometry {
    /// Physical core id.
    pub physical_core: u32,
    /// Whether the core is online.
    pub online: bool,
    /// Whether the core can be cache-isolated from others.
    pub isolatable: bool,
    /// Socket id.
    pub socket_id: u32,
    /// Package id.
    pub package_id: u32,
    /// Cache-domain identifiers at L1/L2/L3.
    pub cache_domains: CacheDomainIds,
    /// Full cache hierarchy (levels, sizes, sharing, inclusivity).
    pub cache_hierarchy: CacheTopology,
    /// NUMA node this core belongs to.
    pub numa_node: u32,
    /// Distance to each NUMA node, indexed by node id, length
    /// `numa_node_count`.
    pub numa_distance: [u32; MAX_NUMA_NODES],
    /// SMT sibling relationship.
    pub smt: SmtInfo,
    /// Frequency facts.
    pub frequency: FrequencyInfo,
    /// Rolled-up security capabilities.
    pub capabilities: CoreCapabilities,
    /// Whether this core has been probed.
    pub probed: bool,
}

impl CoreGeometry {
    /// The zeroed, pre-probe geometry for `physical_core`.
    #[must_use]
    pub const fn empty(physical_core: u32) -> Self {
        Self {
            physical_core,
            online: false,
            isolatable: false,
            socket_id: 0,
            package_id: 0,
            cache_domains: CacheDomainIds { l1: 0, l2: 0, l3: 0 },
            cache_hierarchy: CacheTopology::empty(),
            numa_node: INVALID_ID,
            numa_distance: [0; MAX_NUMA_NODES],
            smt: SmtInfo { has_sibling: false, sibling_id: INVALID_ID },
            frequency: FrequencyInfo { base_mhz: 0, max_mhz: 0, scaling_disabled: false },
            capabilities: CoreCapabilities { constant_time: false, cache_partitioning: false, memory_encryption: false },
            probed: false,
        }
    }
}

/// A fixed-capacity list of core ids, used for NUMA node membership
/// and cache-sharing query results.
#[derive(Debug, Clone, Copy)]
pub struct CoreIdList {
    ids: [u32; MAX_CORES],
    count: usize,
}

impl CoreIdList {
    /// An empty list.
    #[must_use]
    pub const fn empty() -> Self {
        Self { ids: [0; MAX_CORES], count: 0 }
    }

    /// Append a core id. Returns `false` if the list is already at
    /// [`MAX_CORES`].
    #[must_use]
    pub fn push(&mut self, id: u32) -> bool {
        if self.count >= MAX_CORES {
            return false;
        }
        self.ids[self.count] = id;
        self.count += 1;
        true
    }

    /// Number of ids in the list.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// True if the list is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The ids, in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.ids[..self.count]
    }
}

impl Default for CoreIdList {
    fn default() -> Self {
        Self::empty()
    }
}

/// NUMA node membership and distance facts. A distinct type from any
/// scalar node id, since a node is a first-class record (memory
/// capacity, member cores, distance vector), not just a number.
#[derive(Debug, Clone, Copy)]
pub struct NumaNodeInfo {
    /// Node id.
    pub id: u32,
    /// Memory attached to this node, in megabytes.
    pub memory_mb: u32,
    /// Member cores.
    pub cores: CoreIdList,
    /// Distance to each other node, indexed by node id.
    pub distance: [u32; MAX_NUMA_NODES],
    /// Whether this node's membership has been fully derived.
    pub validated: bool,
}

impl NumaNodeInfo {
    /// An empty node record for `id`.
    #[must_use]
    pub const fn empty(id: u32) -> Self {
        Self { id, memory_mb: 0, cores: CoreIdList::empty(), distance: [0; MAX_NUMA_NODES], validated: false }
    }

    /// Number of cores assigned to this node.
    #[must_use]
    pub const fn core_count(&self) -> usize {
        self.cores.len()
    }
}
