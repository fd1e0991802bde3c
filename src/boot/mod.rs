//! Stage 1 of the seal chain: hardware inventory.
//!
//! [`BootFacts`] is populated by driving a [`crate::provider::ProbeProvider`]
//! through a fixed twelve-step sequence (see [`BootFacts::probe`]),
//! validated, and then sealed into an immutable [`SealedBootFacts`]
//! that [`crate::topology::Topology`] borrows read-only.

pub mod error;
pub mod facts;

pub use error::{BootDiagnostic, BootError};
pub use facts::{
    BootMode, BrandString, CacheControlFeatures, CacheKind, CacheLevel, CacheTopology,
    ConstantTimeFeatures, CpuIdentity, MemoryProtectionFeatures, SideChannelFeatures, Vendor,
    BRAND_STRING_LEN,
};

use crate::diagnostics::{Severity, ValidationContext};
use crate::provider::ProbeProvider;

/// Boot-time hardware inventory, pre-seal.
///
/// Call order is always `init` (or [`Default`]) → [`probe`](Self::probe)
/// → [`validate`](Self::validate) → [`seal`](Self::seal). Each step
/// requires the previous to have succeeded; see the individual method
/// docs for exact preconditions.
#[derive(Debug, Clone, Copy)]
pub struct BootFacts {
    cpu: CpuIdentity,
    cache: CacheTopology,
    cpu_count: u32,
    numa_node_count: u32,
    threads_per_core: u32,
    smt_enabled: bool,
    constant_time: ConstantTimeFeatures,
    cache_control: CacheControlFeatures,
    memory_protection: MemoryProtectionFeatures,
    side_channel: SideChannelFeatures,
    trng_available: bool,
    total_memory_mb: u64,
    boot_mode: BootMode,
    probed: bool,
    validated: bool,
}

impl BootFacts {
    /// Zero every field and reset the lifecycle to unprobed.
    #[must_use]
    pub const fn init() -> Self {
        Self {
            cpu: CpuIdentity::empty(),
            cache: CacheTopology::empty(),
            cpu_count: 0,
            numa_node_count: 0,
            threads_per_core: 0,
            smt_enabled: false,
            constant_time: ConstantTimeFeatures::empty(),
            cache_control: CacheControlFeatures::empty(),
            memory_protection: MemoryProtectionFeatures::empty(),
            side_channel: SideChannelFeatures::empty(),
            trng_available: false,
            total_memory_mb: 0,
            boot_mode: BootMode::empty(),
            probed: false,
            validated: false,
        }
    }

    /// Drive `provider` through the fixed twelve-step detection
    /// sequence:
    ///
    /// 1. CPU identity
    /// 2. Cache topology
    /// 3. CPU count
    /// 4. NUMA node count
    /// 5. SMT enablement + threads per core
    /// 6. Constant-time instruction support
    /// 7. Cache-control feature support
    /// 8. Memory-protection feature support
    /// 9. Side-channel mitigation support
    /// 10. TRNG availability
    /// 11. Total memory
    /// 12. Boot mode (UEFI / Secure Boot)
    ///
    /// Steps 1-3 are fatal: a failure aborts the sequence and returns
    /// `Err` without setting `probed`. Every other step degrades to
    /// "feature absent" (`valid = false`) and the sequence continues,
    /// because later steps do not depend on earlier ones succeeding
    /// beyond the first three.
    ///
    /// The order is fixed and never reordered: it is what makes probe
    /// output a pure function of the provider's responses.
    pub fn probe<P: ProbeProvider>(&mut self, provider: &P) -> Result<(), BootError> {
        log::info!("boot: starting hardware detection");

        // Step 1: CPU identity (fatal).
        self.cpu = provider.probe_cpu_info().map_err(|_| {
            log::error!("boot: FATAL cpu identity probe failed");
            BootError::CpuDetectionFailed
        })?;
        log::info!(
            "boot: cpu identity {} family={} model={} stepping={}",
            self.cpu.brand_string.as_str(),
            self.cpu.family,
            self.cpu.model,
            self.cpu.stepping
        );

        // Step 2: cache topology (fatal if zero levels reported).
        self.cache = CacheTopology::empty();
        provider.probe_cache_topology(&mut |level| self.cache.push(level));
        if self.cache.is_empty() {
            log::error!("boot: FATAL cache topology probe failed");
            return Err(BootError::CacheDetectionFailed);
        }
        log::info!("boot: {} cache level(s) detected", self.cache.len());

        // Step 3: CPU count (fatal if zero).
        self.cpu_count = provider.probe_cpu_count();
        if self.cpu_count == 0 {
            log::error!("boot: FATAL no CPUs detected");
            return Err(BootError::NoCpusDetected);
        }
        log::info!("boot: {} cpu(s)", self.cpu_count);

        // Step 4: NUMA node count (degrades to 1 on failure upstream;
        // the provider contract guarantees >= 1 on success).
        self.numa_node_count = provider.probe_numa_node_count().max(1);
        log::info!("boot: {} numa node(s)", self.numa_node_count);

        // Step 5: SMT.
        self.smt_enabled = provider.probe_smt_enabled();
        self.threads_per_core = if self.smt_enabled { provider.probe_threads_per_core().max(2) } else { 1 };
        log::info!("boot: smt_enabled={} threads_per_core={}", self.smt_enabled, self.threads_per_core);

        // Step 6: constant-time support.
        self.constant_time = provider.probe_constant_time_support().unwrap_or_else(|_| {
            log::warn!("boot: constant-time feature probe failed, treating as absent");
            ConstantTimeFeatures::empty()
        });

        // Step 7: cache-control support.
        self.cache_control = provider.probe_cache_control().unwrap_or_else(|_| {
            log::warn!("boot: cache-control feature probe failed, treating as absent");
            CacheControlFeatures::empty()
        });

        // Step 8: memory-protection support.
        self.memory_protection = provider.probe_memory_protection().unwrap_or_else(|_| {
            log::warn!("boot: memory-protection feature probe failed, treating as absent");
            MemoryProtectionFeatures::empty()
        });

        // Step 9: side-channel mitigation support.
        self.side_channel = provider.probe_side_channel_mitigation().unwrap_or_else(|_| {
            log::warn!("boot: side-channel mitigation probe failed, treating as absent");
            SideChannelFeatures::empty()
        });

        // Step 10: TRNG.
        self.trng_available = provider.probe_trng_available();

        // Step 11: total memory.
        self.total_memory_mb = provider.probe_total_memory_mb();

        // Step 12: boot mode.
        self.boot_mode = BootMode {
            uefi: provider.probe_uefi_boot(),
            secure_boot: provider.probe_secure_boot_enabled(),
        };

        self.probed = true;
        log::info!("boot: probing complete");
        Ok(())
    }

    /// Evaluate the hard-fail / warn checklist and accumulate every
    /// finding into `ctx`. Returns the worst [`Severity`] seen.
    /// `validated` is set if and only if no `HardFail` was recorded.
    pub fn validate(&mut self, ctx: &mut ValidationContext<BootDiagnostic>) -> Severity {
        if !self.probed {
            ctx.record(Severity::HardFail, BootDiagnostic::NotProbed);
            return ctx.worst();
        }

        if self.cpu_count < 2 {
            ctx.record(Severity::HardFail, BootDiagnostic::CpuCountTooLow { count: self.cpu_count });
        }
        if self.cache.is_empty() {
            ctx.record(Severity::HardFail, BootDiagnostic::NoCacheLevels);
        }
        if self.numa_node_count < 1 {
            ctx.record(Severity::HardFail, BootDiagnostic::NoNumaNodes);
        }

        if !self.constant_time_supported() {
            ctx.record(Severity::Warn, BootDiagnostic::ConstantTimeUnsupported);
        }
        if !self.trng_available {
            ctx.record(Severity::Warn, BootDiagnostic::TrngUnavailable);
        }
        if self.smt_enabled {
            ctx.record(Severity::Warn, BootDiagnostic::SmtEnabled);
        }
        if !self.boot_mode.secure_boot {
            ctx.record(Severity::Warn, BootDiagnostic::SecureBootDisabled);
        }

        self.validated = ctx.worst().allows_boot();
        ctx.worst()
    }

    /// Consume this record and seal it, provided validation accepted
    /// (with or without warnings). Once sealed the returned
    /// [`SealedBootFacts`] has no mutators at all.
    pub fn seal(self) -> Result<SealedBootFacts, (Self, BootError)> {
        if !self.validated {
            let err = if self.probed { BootError::ValidationFailed } else { BootError::NotValidated };
            return Err((self, err));
        }
        log::info!("boot: sealed");
        Ok(SealedBootFacts { facts: self })
    }

    /// Aggregate: constant-time instruction support, defined narrowly
    /// as `aes_ni && rdrand` (RDSEED and the multiply/compare flags are
    /// deliberately excluded: they're necessary but not sufficient for
    /// the constant-time crypto primitives this flag gates).
    #[must_use]
    pub const fn constant_time_supported(&self) -> bool {
        self.constant_time.valid && self.constant_time.aes_ni && self.constant_time.rdrand
    }

    /// Aggregate: cache partitioning support, via either base CAT or CDP.
    #[must_use]
    pub const fn cache_partitioning_supported(&self) -> bool {
        self.cache_control.valid && (self.cache_control.cat || self.cache_control.cdp)
    }

    /// Aggregate: baseline memory-protection support (NX + SMEP + SMAP).
    #[must_use]
    pub const fn memory_protection_supported(&self) -> bool {
        self.memory_protection.valid
            && self.memory_protection.nx
            && self.memory_protection.smep
            && self.memory_protection.smap
    }

    /// Aggregate: total memory encryption support.
    #[must_use]
    pub const fn memory_encryption_supported(&self) -> bool {
        self.memory_protection.valid && self.memory_protection.tme
    }

    /// Aggregate: side-channel mitigation support (IBRS + STIBP).
    #[must_use]
    pub const fn side_channel_mitigations_supported(&self) -> bool {
        self.side_channel.valid && self.side_channel.ibrs && self.side_channel.stibp
    }

    /// CPU identity.
    #[must_use]
    pub const fn cpu_identity(&self) -> &CpuIdentity {
        &self.cpu
    }

    /// Cache levels.
    #[must_use]
    pub const fn cache_topology(&self) -> &CacheTopology {
        &self.cache
    }

    /// Logical CPU count.
    #[must_use]
    pub const fn cpu_count(&self) -> u32 {
        self.cpu_count
    }

    /// NUMA node count.
    #[must_use]
    pub const fn numa_node_count(&self) -> u32 {
        self.numa_node_count
    }

    /// Threads per physical core.
    #[must_use]
    pub const fn threads_per_core(&self) -> u32 {
        self.threads_per_core
    }

    /// Whether SMT is enabled.
    #[must_use]
    pub const fn smt_enabled(&self) -> bool {
        self.smt_enabled
    }

    /// Whether the system booted via UEFI.
    #[must_use]
    pub const fn uefi_boot(&self) -> bool {
        self.boot_mode.uefi
    }

    /// Whether UEFI Secure Boot is enabled.
    #[must_use]
    pub const fn secure_boot_enabled(&self) -> bool {
        self.boot_mode.secure_boot
    }

    /// Whether a hardware TRNG is available.
    #[must_use]
    pub const fn trng_available(&self) -> bool {
        self.trng_available
    }

    /// Total system memory in megabytes.
    #[must_use]
    pub const fn total_memory_mb(&self) -> u64 {
        self.total_memory_mb
    }

    /// Whether `probe` has completed.
    #[must_use]
    pub const fn is_probed(&self) -> bool {
        self.probed
    }

    /// Whether `validate` has accepted this record.
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        self.validated
    }
}

impl Default for BootFacts {
    fn default() -> Self {
        Self::init()
    }
}

/// An immutable, sealed [`BootFacts`]. No mutators exist on this type:
/// [`crate::topology::Topology::init`] borrows it read-only, and there
/// is no way to unseal it. This is the `BootFacts → SealedBootFacts`
/// type-state split spec's design notes call for.
#[derive(Debug, Clone, Copy)]
pub struct SealedBootFacts {
    facts: BootFacts,
}

impl SealedBootFacts {
    /// Borrow the sealed facts through every read-only query on
    /// [`BootFacts`].
    #[must_use]
    pub const fn facts(&self) -> &BootFacts {
        &self.facts
    }
}

impl core::ops::Deref for SealedBootFacts {
    type Target = BootFacts;

    fn deref(&self) -> &BootFacts {
        &self.facts
    }
}
