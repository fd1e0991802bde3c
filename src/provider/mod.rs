//! The `ProbeProvider` capability boundary between the architecture-
//! specific hardware back-end and the core seal chain.
//!
//! The core never touches a CPUID register, an MSR, or an ACPI table
//! directly. It drives a `ProbeProvider` through a fixed sequence of
//! calls and folds the results into a [`crate::boot::BootFacts`]. This
//! keeps the core free of `unsafe` and of architecture `cfg`s, and
//! makes [`scripted::ScriptedProvider`] usable to exercise every
//! validation path deterministically.

pub mod scripted;
#[cfg(all(feature = "x86_64-provider", target_arch = "x86_64"))]
pub mod x86_64;

use crate::boot::facts::{
    BootMode, CacheControlFeatures, CacheLevel, ConstantTimeFeatures, CpuIdentity,
    MemoryProtectionFeatures, SideChannelFeatures,
};

/// A single probe operation either produces its value or fails.
///
/// Most probes degrade to "feature absent" on failure rather than
/// propagating an error — see [`crate::boot::BootFacts::probe`] for
/// which three steps are fatal.
pub type ProbeResult<T> = Result<T, ProbeFailure>;

/// Why a probe operation failed. Architecture-neutral: the provider
/// translates whatever went wrong (missing CPUID leaf, MSR read fault,
/// ACPI table absent) into this one reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeFailure;

/// The capability set the core requires from an architecture-specific
/// hardware back-end. Every operation is synchronous and pure: same
/// machine state implies the same result, which is what makes
/// [`crate::boot::BootFacts::probe`]'s fixed twelve-step sequence a
/// pure function of the provider's answers.
pub trait ProbeProvider {
    /// CPU identity (vendor, family, model, stepping, brand string).
    fn probe_cpu_info(&self) -> ProbeResult<CpuIdentity>;

    /// Cache levels, in level order. The callback receives each level
    /// as it is discovered; returning fewer than one level is
    /// equivalent to probe failure for the caller.
    fn probe_cache_topology(&self, out: &mut dyn FnMut(CacheLevel) -> bool);

    /// Number of logical CPUs. `0` signals failure.
    fn probe_cpu_count(&self) -> u32;

    /// Number of NUMA nodes. Always `>= 1` on success.
    fn probe_numa_node_count(&self) -> u32;

    /// Whether SMT (hyperthreading) is enabled.
    fn probe_smt_enabled(&self) -> bool;

    /// Threads per physical core.
    fn probe_threads_per_core(&self) -> u32;

    /// Constant-time instruction support.
    fn probe_constant_time_support(&self) -> ProbeResult<ConstantTimeFeatures>;

    /// Cache-control instruction/MSR support.
    fn probe_cache_control(&self) -> ProbeResult<CacheControlFeatures>;

    /// Memory protection feature support.
    fn probe_memory_protection(&self) -> ProbeResult<MemoryProtectionFeatures>;

    /// Side-channel mitigation support.
    fn probe_side_channel_mitigation(&self) -> ProbeResult<SideChannelFeatures>;

    /// Hardware TRNG availability (RDRAND/RDSEED or equivalent).
    fn probe_trng_available(&self) -> bool;

    /// Total system memory in megabytes.
    ///
    /// Real implementations must consult the firmware memory map; a
    /// provider that cannot do so yet may return a conservative stub
    /// value (see [`x86_64::X86_64Provider`]'s documented limitation).
    fn probe_total_memory_mb(&self) -> u64;

    /// Whether the system booted via UEFI.
    fn probe_uefi_boot(&self) -> bool;

    /// Whether UEFI Secure Boot is enabled.
    fn probe_secure_boot_enabled(&self) -> bool;

    /// Base (guaranteed) operating frequency in MHz, assumed uniform
    /// across cores on the single-socket, homogeneous machines this
    /// crate targets.
    fn probe_base_freq_mhz(&self) -> u32;

    /// Maximum (turbo/boost) operating frequency in MHz.
    fn probe_max_freq_mhz(&self) -> u32;

    /// Whether dynamic frequency scaling is disabled platform-wide.
    /// Required for deterministic timing; see
    /// [`crate::topology::Topology::validate`].
    fn probe_freq_scaling_disabled(&self) -> bool;
}
