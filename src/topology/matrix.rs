//! The precomputed, symmetric cache-isolation matrix.
//!
//! Only the upper triangle (including the diagonal) is stored; `get`
//! normalizes the argument order so callers never need to care which
//! index is smaller.

use crate::topology::geometry::CacheDomainIds;
use crate::limits::MAX_CORES;

const TRIANGLE_LEN: usize = MAX_CORES * (MAX_CORES + 1) / 2;

/// Cache isolation relationship between two cores: the deepest level
/// at which they have disjoint cache-sharing domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CacheIsolationLevel {
    /// Cores share their innermost (L1) cache domain.
    #[default]
    None = 0,
    /// Private L1, shared from L2 outward.
    L1 = 1,
    /// Private L1/L2, shared from L3 outward.
    L2 = 2,
    /// Private L1/L2/L3, shared beyond (only reachable with a deeper
    /// hierarchy than this crate's three named cache-domain levels
    /// track).
    L3 = 3,
    /// No shared cache at any tracked level.
    Full = 4,
}

/// The precomputed, symmetric isolation relationship for every ordered
/// pair of cores.
#[derive(Debug, Clone, Copy)]
pub struct CacheIsolationMatrix {
    levels: [CacheIsolationLevel; TRIANGLE_LEN],
    computed: bool,
}

const fn triangle_index(a: usize, b: usize) -> usize {
    // Requires a <= b. Row-major upper-triangle packing:
    // offset of row `a` is a*MAX_CORES - a*(a-1)/2.
    let row_offset = a * MAX_CORES - (a * a.saturating_sub(1)) / 2;
    row_offset + (b - a)
}

impl CacheIsolationMatrix {
    /// An empty, not-yet-computed matrix.
    #[must_use]
    pub const fn empty() -> Self {
        Self { levels: [CacheIsolationLevel::None; TRIANGLE_LEN], computed: false }
    }

    /// Write the isolation level for the unordered pair `(a, b)`.
    pub fn set(&mut self, a: u32, b: u32, level: CacheIsolationLevel) {
        let (lo, hi) = if a <= b { (a as usize, b as usize) } else { (b as usize, a as usize) };
        self.levels[triangle_index(lo, hi)] = level;
    }

    /// Read the isolation level for the unordered pair `(a, b)`.
    /// `a == b` always yields [`CacheIsolationLevel::Full`] regardless
    /// of what was written, matching the diagonal invariant.
    #[must_use]
    pub fn get(&self, a: u32, b: u32) -> CacheIsolationLevel {
        if a == b {
            return CacheIsolationLevel::Full;
        }
        let (lo, hi) = if a <= b { (a as usize, b as usize) } else { (b as usize, a as usize) };
        self.levels[triangle_index(lo, hi)]
    }

    /// Mark the matrix as fully computed.
    pub fn set_computed(&mut self) {
        self.computed = true;
    }

    /// Whether [`build`](super::Topology::build_cache_isolation_matrix)
    /// has run.
    #[must_use]
    pub const fn computed(&self) -> bool {
        self.computed
    }
}

impl Default for CacheIsolationMatrix {
    fn default() -> Self {
        Self::empty()
    }
}

/// Derive the isolation level for a pair of cores from their
/// cache-domain identifiers. Domains are nested (sharing a coarser
/// level implies sharing every coarser level beyond it), so the first
/// shared level from L1 outward determines the result.
#[must_use]
pub fn isolation_for(a: CacheDomainIds, b: CacheDomainIds) -> CacheIsolationLevel {
    if a.l1 == b.l1 {
        return CacheIsolationLevel::None;
    }
    if a.l2 == b.l2 {
        return CacheIsolationLevel::L1;
    }
    if a.l3 == b.l3 {
        return CacheIsolationLevel::L2;
    }
    CacheIsolationLevel::Full
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_is_always_full() {
        let m = CacheIsolationMatrix::empty();
        assert_eq!(m.get(5, 5), CacheIsolationLevel::Full);
    }

    #[test]
    fn set_then_get_is_symmetric() {
        let mut m = CacheIsolationMatrix::empty();
        m.set(2, 7, CacheIsolationLevel::L2);
        assert_eq!(m.get(2, 7), CacheIsolationLevel::L2);
        assert_eq!(m.get(7, 2), CacheIsolationLevel::L2);
    }

    #[test]
    fn isolation_for_shared_l1_is_none() {
        let a = CacheDomainIds { l1: 0, l2: 0, l3: 0 };
        let b = CacheDomainIds { l1: 0, l2: 0, l3: 0 };
        assert_eq!(isolation_for(a, b), CacheIsolationLevel::None);
    }

    #[test]
    fn isolation_for_shared_l3_only_is_l2() {
        let a = CacheDomainIds { l1: 1, l2: 1, l3: 0 };
        let b = CacheDomainIds { l1: 2, l2: 2, l3: 0 };
        assert_eq!(isolation_for(a, b), CacheIsolationLevel::L2);
    }

    #[test]
    fn isolation_for_fully_disjoint_is_full() {
        let a = CacheDomainIds { l1: 1, l2: 1, l3: 1 };
        let b = CacheDomainIds { l1: 2, l2: 2, l3: 2 };
        assert_eq!(isolation_for(a, b), CacheIsolationLevel::Full);
    }

    #[test]
    fn triangle_packing_covers_every_pair_without_overlap() {
        let mut seen = std::collections::HashSet::new();
        for a in 0..8usize {
            for b in a..8usize {
                let idx = triangle_index(a, b);
                assert!(idx < TRIANGLE_LEN);
                assert!(seen.insert(idx), "collision at ({a},{b}) -> {idx}");
            }
        }
    }
}
