//! Field-level types making up a [`super::SecurityDomain`].

use crate::limits::{MAX_DEPENDENCIES, MAX_DOMAIN_CORES};

/// Domain identifier. `0` is conventionally the boot domain;
/// [`DOMAIN_ID_INVALID`] is never a legal id.
pub type DomainId = u32;

/// The invalid-domain sentinel.
pub const DOMAIN_ID_INVALID: DomainId = 0xFFFF_FFFF;

/// The conventional boot-domain id.
pub const DOMAIN_ID_BOOT: DomainId = 0;

const NAME_LEN: usize = 64;

/// A fixed-capacity domain name, capacity [`NAME_LEN`] (including any
/// NUL slack).
#[derive(Debug, Clone, Copy)]
pub struct DomainName {
    bytes: [u8; NAME_LEN],
    len: usize,
}

impl DomainName {
    /// The empty name.
    #[must_use]
    pub const fn empty() -> Self {
        Self { bytes: [0u8; NAME_LEN], len: 0 }
    }

    /// Build a name from a byte slice, truncating to capacity.
    #[must_use]
    pub fn from_bytes(src: &[u8]) -> Self {
        let mut bytes = [0u8; NAME_LEN];
        let len = src.len().min(NAME_LEN);
        bytes[..len].copy_from_slice(&src[..len]);
        Self { bytes, len }
    }

    /// View the name as UTF-8, falling back to a placeholder on
    /// invalid bytes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len]).unwrap_or("<invalid domain name>")
    }

    /// True if the name has zero length.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for DomainName {
    fn default() -> Self {
        Self::empty()
    }
}

/// Security level: an ordinal, requirement-defined trust tier, not a
/// generic "high/medium/low" label. `Undefined` is always an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SecurityLevel {
    /// Never explicitly set; always a validation error.
    #[default]
    Undefined = 0,
    /// Level 0 (least trusted, by convention).
    L0 = 1,
    /// Level 1.
    L1 = 2,
    /// Level 2.
    L2 = 3,
    /// Level 3.
    L3 = 4,
    /// Level 4.
    L4 = 5,
    /// Level 5.
    L5 = 6,
    /// Level 6.
    L6 = 7,
    /// Level 7 (most trusted, by convention).
    L7 = 8,
}

/// Preemption policy: who may interrupt tasks running in this domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreemptionPolicy {
    /// Never explicitly set; always a validation error.
    #[default]
    Undefined,
    /// Tasks run to completion.
    Never,
    /// Only higher security levels may preempt.
    ByHigher,
    /// Domains at the same level may preempt.
    BySame,
    /// Any domain may preempt.
    ByAny,
}

/// Memory sharing policy for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryDomainType {
    /// Never explicitly set; always a validation error.
    #[default]
    Undefined,
    /// No sharing with other domains.
    Isolated,
    /// Read-only sharing allowed.
    SharedRead,
    /// Read-write sharing allowed.
    SharedWrite,
}

/// A domain's cache-isolation *requirement*. Distinct from
/// [`crate::topology::CacheIsolationLevel`] (a measured topology
/// *fact*) even though the variants line up one-to-one, because this
/// one additionally has an `Undefined` state that is always an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheIsolationRequirement {
    /// Never explicitly set; always a validation error.
    #[default]
    Undefined,
    /// Cores may share all caches.
    None,
    /// Private L1 required.
    L1,
    /// Private L1 and L2 required.
    L2,
    /// Private L1, L2, and L3 required.
    L3,
    /// No shared cache at any level.
    Full,
}

impl CacheIsolationRequirement {
    /// Translate to the matching measured topology level. `None` only
    /// for `Undefined`, which field-completeness validation rejects
    /// before this conversion is ever relied upon.
    #[must_use]
    pub fn as_topology_level(self) -> Option<crate::topology::CacheIsolationLevel> {
        use crate::topology::CacheIsolationLevel as T;
        match self {
            CacheIsolationRequirement::Undefined => None,
            CacheIsolationRequirement::None => Some(T::None),
            CacheIsolationRequirement::L1 => Some(T::L1),
            CacheIsolationRequirement::L2 => Some(T::L2),
            CacheIsolationRequirement::L3 => Some(T::L3),
            CacheIsolationRequirement::Full => Some(T::Full),
        }
    }
}

/// A 256-bit core membership bitmap with a cached count and an
/// explicit witness. An empty set with `explicit = true` is still a
/// validation error (§3.3): it means the field was assigned but
/// assigned nothing, which is never legal for a domain's cores.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreSet {
    bitmap: [u64; 4],
    count: u32,
    /// Whether this field was explicitly assigned.
    pub explicit: bool,
}

impl CoreSet {
    /// The empty, unassigned set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { bitmap: [0; 4], count: 0, explicit: false }
    }

    /// Add a core. No-op if `core >= MAX_DOMAIN_CORES` or already
    /// present. Marks the set explicit.
    pub fn add(&mut self, core: u32) {
        if (core as usize) >= MAX_DOMAIN_CORES {
            return;
        }
        let (word, bit) = (core as usize / 64, core as usize % 64);
        let mask = 1u64 << bit;
        if self.bitmap[word] & mask == 0 {
            self.bitmap[word] |= mask;
            self.count += 1;
        }
        self.explicit = true;
    }

    /// True if `core` is a member.
    #[must_use]
    pub fn contains(&self, core: u32) -> bool {
        if (core as usize) >= MAX_DOMAIN_CORES {
            return false;
        }
        let (word, bit) = (core as usize / 64, core as usize % 64);
        self.bitmap[word] & (1u64 << bit) != 0
    }

    /// True if no cores are members (regardless of `explicit`).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Cached member count.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// True if `self` and `other` share any member core.
    #[must_use]
    pub fn overlaps(&self, other: &CoreSet) -> bool {
        self.bitmap.iter().zip(other.bitmap.iter()).any(|(a, b)| a & b != 0)
    }

    /// Iterate over member core ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..MAX_DOMAIN_CORES as u32).filter(move |&c| self.contains(c))
    }
}

/// A fixed-capacity dependency set (domain ids this domain depends
/// on), with an explicit witness (`explicit = false` is treated the
/// same as "no dependencies", since an empty dependency set is always
/// legal — unlike `CoreSet`, there is no "assigned but empty" error
/// case here).
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencySet {
    ids: [DomainId; MAX_DEPENDENCIES],
    count: usize,
}

impl DependencySet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { ids: [0; MAX_DEPENDENCIES], count: 0 }
    }

    /// Add a dependency. Returns `false` if already at
    /// [`MAX_DEPENDENCIES`].
    #[must_use]
    pub fn add(&mut self, id: DomainId) -> bool {
        if self.count >= MAX_DEPENDENCIES {
            return false;
        }
        self.ids[self.count] = id;
        self.count += 1;
        true
    }

    /// True if `id` is a declared dependency.
    #[must_use]
    pub fn contains(&self, id: DomainId) -> bool {
        self.ids[..self.count].contains(&id)
    }

    /// The declared dependencies, in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[DomainId] {
        &self.ids[..self.count]
    }
}

/// A single security domain: a named set of cores plus the policy
/// that governs them. Every field here has either a non-`Undefined`
/// enum value or an `_explicit` witness bit; there are no defaults
/// anywhere (see [`super::validators::validate_field_completeness`]).
#[derive(Debug, Clone, Copy)]
pub struct SecurityDomain {
    /// Domain identifier.
    pub id: DomainId,
    /// Domain name.
    pub name: DomainName,
    /// Whether `name` was explicitly set.
    pub name_explicit: bool,
    /// Requirement-defined trust tier.
    pub security_level: SecurityLevel,
    /// Who may preempt tasks in this domain.
    pub preemption: PreemptionPolicy,
    /// Assigned cores.
    pub cores: CoreSet,
    /// Required cache isolation from every other domain's cores.
    pub cache_isolation: CacheIsolationRequirement,
    /// Memory sharing policy.
    pub memory_type: MemoryDomainType,
    /// Whether this domain requires NUMA-local memory.
    pub numa_local: bool,
    /// Whether `numa_local` was explicitly set.
    pub numa_local_explicit: bool,
    /// Domains this one depends on.
    pub dependencies: DependencySet,
}

impl SecurityDomain {
    /// A domain with `id` and every other field in its unset state.
    /// Every unset field is a validation error until explicitly
    /// assigned through the builder-style setters below.
    #[must_use]
    pub const fn empty(id: DomainId) -> Self {
        Self {
            id,
            name: DomainName::empty(),
            name_explicit: false,
            security_level: SecurityLevel::Undefined,
            preemption: PreemptionPolicy::Undefined,
            cores: CoreSet::empty(),
            cache_isolation: CacheIsolationRequirement::Undefined,
            memory_type: MemoryDomainType::Undefined,
            numa_local: false,
            numa_local_explicit: false,
            dependencies: DependencySet::empty(),
        }
    }

    /// Set the name explicitly.
    pub fn with_name(mut self, name: &[u8]) -> Self {
        self.name = DomainName::from_bytes(name);
        self.name_explicit = true;
        self
    }

    /// Set the security level explicitly.
    #[must_use]
    pub const fn with_security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self
    }

    /// Set the preemption policy explicitly.
    #[must_use]
    pub const fn with_preemption(mut self, policy: PreemptionPolicy) -> Self {
        self.preemption = policy;
        self
    }

    /// Assign a core to this domain.
    pub fn with_core(mut self, core: u32) -> Self {
        self.cores.add(core);
        self
    }

    /// Set the cache isolation requirement explicitly.
    #[must_use]
    pub const fn with_cache_isolation(mut self, req: CacheIsolationRequirement) -> Self {
        self.cache_isolation = req;
        self
    }

    /// Set the memory domain type explicitly.
    #[must_use]
    pub const fn with_memory_type(mut self, memory_type: MemoryDomainType) -> Self {
        self.memory_type = memory_type;
        self
    }

    /// Set `numa_local` explicitly.
    #[must_use]
    pub const fn with_numa_local(mut self, numa_local: bool) -> Self {
        self.numa_local = numa_local;
        self.numa_local_explicit = true;
        self
    }

    /// Add a dependency on another domain. Fails if this domain's
    /// dependency set is already at
    /// [`MAX_DEPENDENCIES`](crate::limits::MAX_DEPENDENCIES): overflow
    /// is a hard error here, not a silently dropped dependency.
    pub fn with_dependency(mut self, dep: DomainId) -> Result<Self, super::error::DomainError> {
        if !self.dependencies.add(dep) {
            return Err(super::error::DomainError::DependencyCapacityExceeded { domain: self.id });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;

    #[test]
    fn with_dependency_rejects_past_capacity() {
        let mut domain = SecurityDomain::empty(0);
        for i in 0..MAX_DEPENDENCIES as u32 {
            domain = domain.with_dependency(i).expect("within capacity");
        }
        let err = domain.with_dependency(MAX_DEPENDENCIES as u32).unwrap_err();
        assert_eq!(err, DomainError::DependencyCapacityExceeded { domain: 0 });
    }
}
