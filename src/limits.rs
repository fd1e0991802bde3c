//! Compile-time capacity limits for the boot-time security pipeline.
//!
//! Every bounded collection in this crate is sized from one of these
//! constants. There is no dynamic allocation anywhere in the seal
//! chain: a collection that would need to grow past its limit is a
//! hard validation error, never a silent truncation.

/// Maximum number of physical cores the topology can describe.
pub const MAX_CORES: usize = 256;

/// Maximum number of declared security domains.
pub const MAX_DOMAINS: usize = 64;

/// Maximum number of distinct cache levels per core (L1..L4).
pub const MAX_CACHE_LEVELS: usize = 4;

/// Maximum number of NUMA nodes.
pub const MAX_NUMA_NODES: usize = 8;

/// Maximum number of dependency edges per domain.
pub const MAX_DEPENDENCIES: usize = 32;

/// Maximum number of cores a single domain may claim.
pub const MAX_DOMAIN_CORES: usize = 256;

/// Maximum number of diagnostics a single validation pass accumulates
/// before further diagnostics are dropped (and the pass is forced to
/// `HardFail`, see [`crate::diagnostics::ValidationContext`]).
pub const MAX_DIAGNOSTICS: usize = 64;

static_assertions::const_assert!(MAX_CORES <= 256);
static_assertions::const_assert!(MAX_DOMAIN_CORES <= MAX_CORES);
static_assertions::const_assert!(MAX_NUMA_NODES <= 8);
static_assertions::const_assert!(MAX_CACHE_LEVELS <= 4);
static_assertions::const_assert!(MAX_DIAGNOSTICS >= 32);
