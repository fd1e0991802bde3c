//! A deterministic, fully-scripted [`super::ProbeProvider`] used to
//! drive the seal chain in tests without touching real hardware.
//!
//! Every field defaults to the "machine reports nothing" state so a
//! test only has to set the facts it cares about.

use super::{ProbeFailure, ProbeProvider, ProbeResult};
use crate::boot::facts::{
    BootMode, CacheControlFeatures, CacheLevel, ConstantTimeFeatures, CpuIdentity,
    MemoryProtectionFeatures, SideChannelFeatures,
};
use crate::limits::MAX_CACHE_LEVELS;

/// A scripted provider: every answer is a plain field you set before
/// calling [`crate::boot::BootFacts::probe`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedProvider {
    /// Answer for `probe_cpu_info`. `None` simulates fatal failure.
    pub cpu_info: Option<CpuIdentity>,
    /// Answer for `probe_cache_topology`. Empty simulates fatal failure.
    pub cache_levels: [Option<CacheLevel>; MAX_CACHE_LEVELS],
    /// Answer for `probe_cpu_count`. `0` simulates fatal failure.
    pub cpu_count: u32,
    /// Answer for `probe_numa_node_count`.
    pub numa_node_count: u32,
    /// Answer for `probe_smt_enabled`.
    pub smt_enabled: bool,
    /// Answer for `probe_threads_per_core`.
    pub threads_per_core: u32,
    /// Answer for `probe_constant_time_support`. `None` simulates failure.
    pub constant_time: Option<ConstantTimeFeatures>,
    /// Answer for `probe_cache_control`. `None` simulates failure.
    pub cache_control: Option<CacheControlFeatures>,
    /// Answer for `probe_memory_protection`. `None` simulates failure.
    pub memory_protection: Option<MemoryProtectionFeatures>,
    /// Answer for `probe_side_channel_mitigation`. `None` simulates failure.
    pub side_channel: Option<SideChannelFeatures>,
    /// Answer for `probe_trng_available`.
    pub trng_available: bool,
    /// Answer for `probe_total_memory_mb`.
    pub total_memory_mb: u64,
    /// Answer for boot mode probes.
    pub boot_mode: BootMode,
    /// Answer for `probe_base_freq_mhz`.
    pub base_freq_mhz: u32,
    /// Answer for `probe_max_freq_mhz`.
    pub max_freq_mhz: u32,
    /// Answer for `probe_freq_scaling_disabled`.
    pub freq_scaling_disabled: bool,
}

impl ScriptedProvider {
    /// A minimally-valid, fully-populated fixture matching the
    /// "minimal pass" scenario: Intel, 4 cores, 1 NUMA node, no SMT,
    /// L1/L2 private, L3 shared, every feature present, frequency
    /// scaling disabled.
    #[must_use]
    pub fn minimal_pass_fixture() -> Self {
        let mut levels = [None; MAX_CACHE_LEVELS];
        levels[0] = Some(CacheLevel {
            level: 1,
            kind: crate::boot::facts::CacheKind::Data,
            size_bytes: 32 * 1024,
            line_size: 64,
            ways: 8,
            shared: false,
            inclusive: false,
        });
        levels[1] = Some(CacheLevel {
            level: 2,
            kind: crate::boot::facts::CacheKind::Unified,
            size_bytes: 256 * 1024,
            line_size: 64,
            ways: 8,
            shared: false,
            inclusive: false,
        });
        levels[2] = Some(CacheLevel {
            level: 3,
            kind: crate::boot::facts::CacheKind::Unified,
            size_bytes: 8 * 1024 * 1024,
            line_size: 64,
            ways: 16,
            shared: true,
            inclusive: true,
        });

        Self {
            cpu_info: Some(CpuIdentity {
                vendor: crate::boot::facts::Vendor::Intel,
                family: 6,
                model: 154,
                stepping: 3,
                brand_string: crate::boot::facts::BrandString::from_bytes(b"Test Intel CPU"),
            }),
            cache_levels: levels,
            cpu_count: 4,
            numa_node_count: 1,
            smt_enabled: false,
            threads_per_core: 1,
            constant_time: Some(ConstantTimeFeatures {
                aes_ni: true,
                rdrand: true,
                rdseed: true,
                ct_mul: true,
                ct_cmp: true,
                valid: true,
            }),
            cache_control: Some(CacheControlFeatures {
                clflush: true,
                clflushopt: true,
                clwb: true,
                cat: true,
                cdp: true,
                valid: true,
            }),
            memory_protection: Some(MemoryProtectionFeatures {
                nx: true,
                smep: true,
                smap: true,
                pku: true,
                tme: true,
                valid: true,
            }),
            side_channel: Some(SideChannelFeatures {
                ibrs: true,
                stibp: true,
                ssbd: true,
                md_clear: true,
                valid: true,
            }),
            trng_available: true,
            total_memory_mb: 16384,
            boot_mode: BootMode { uefi: true, secure_boot: true },
            base_freq_mhz: 2800,
            max_freq_mhz: 4200,
            freq_scaling_disabled: true,
        }
    }
}

impl ProbeProvider for ScriptedProvider {
    fn probe_cpu_info(&self) -> ProbeResult<CpuIdentity> {
        self.cpu_info.ok_or(ProbeFailure)
    }

    fn probe_cache_topology(&self, out: &mut dyn FnMut(CacheLevel) -> bool) {
        for level in self.cache_levels.into_iter().flatten() {
            if !out(level) {
                break;
            }
        }
    }

    fn probe_cpu_count(&self) -> u32 {
        self.cpu_count
    }

    fn probe_numa_node_count(&self) -> u32 {
        self.numa_node_count
    }

    fn probe_smt_enabled(&self) -> bool {
        self.smt_enabled
    }

    fn probe_threads_per_core(&self) -> u32 {
        self.threads_per_core
    }

    fn probe_constant_time_support(&self) -> ProbeResult<ConstantTimeFeatures> {
        self.constant_time.ok_or(ProbeFailure)
    }

    fn probe_cache_control(&self) -> ProbeResult<CacheControlFeatures> {
        self.cache_control.ok_or(ProbeFailure)
    }

    fn probe_memory_protection(&self) -> ProbeResult<MemoryProtectionFeatures> {
        self.memory_protection.ok_or(ProbeFailure)
    }

    fn probe_side_channel_mitigation(&self) -> ProbeResult<SideChannelFeatures> {
        self.side_channel.ok_or(ProbeFailure)
    }

    fn probe_trng_available(&self) -> bool {
        self.trng_available
    }

    fn probe_total_memory_mb(&self) -> u64 {
        self.total_memory_mb
    }

    fn probe_uefi_boot(&self) -> bool {
        self.boot_mode.uefi
    }

    fn probe_secure_boot_enabled(&self) -> bool {
        self.boot_mode.secure_boot
    }

    fn probe_base_freq_mhz(&self) -> u32 {
        self.base_freq_mhz
    }

    fn probe_max_freq_mhz(&self) -> u32 {
        self.max_freq_mhz
    }

    fn probe_freq_scaling_disabled(&self) -> bool {
        self.freq_scaling_disabled
    }
}
