//! Configuration system for the simulator.
//!
//! Scaled down from the teacher's hierarchical `Config` to what spec.md §6
//! needs: a start PC per architecture, the initial physical memory map,
//! and MMIO base addresses for the built-in device types `add` can
//! instantiate. `Config::default()` mirrors the baseline the original
//! `msim` ships with (32 MiB RWM at the default architecture's reset
//! vector, one terminal and one printer available).

use serde::Deserialize;

/// Default configuration constants, mirroring the teacher's `config::defaults`
/// module.
mod defaults {
    /// Base physical address of the default RWM region. Matches
    /// [`RV_RESET_VECTOR`] so a default (RV32IMA) machine resets into
    /// mapped memory instead of faulting on its first fetch.
    pub const RAM_BASE: u64 = RV_RESET_VECTOR as u64;

    /// Size of the default RWM region (32 MiB).
    pub const RAM_SIZE: u64 = 32 * 1024 * 1024;

    /// Reset PC for an RV32IMA hart (matches a typical bare-metal ELF load
    /// address).
    pub const RV_RESET_VECTOR: u32 = 0x8000_0000;

    /// Base MMIO address handed to the first `dprinter` the config creates.
    pub const PRINTER_BASE: u64 = 0x1000_0000;

    /// Base MMIO address handed to the first `dkeyboard` the config creates.
    pub const TERMINAL_BASE: u64 = 0x1000_1000;
}

/// General simulator-wide options (spec.md §6: trace flag, architecture
/// selection).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Which architecture the machine's harts implement.
    pub arch: Architecture,
    /// Number of harts to create at startup.
    pub hart_count: usize,
    /// Per-instruction `tracing::trace!` logging (spec.md §12).
    pub trace: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            arch: Architecture::Riscv,
            hart_count: 1,
            trace: false,
        }
    }
}

/// Which instruction set the machine's harts implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// RV32IMA, per spec.md §1.
    Riscv,
    /// MIPS R4000, per spec.md §1.
    Mips,
}

/// Physical memory layout (spec.md §4.1).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Base address of the default read-write region.
    pub ram_base: u64,
    /// Size in bytes of the default read-write region.
    pub ram_size: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ram_base: defaults::RAM_BASE,
            ram_size: defaults::RAM_SIZE,
        }
    }
}

/// MMIO base addresses offered to the built-in device types (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceDefaults {
    /// Suggested base address for the first `dprinter` added.
    pub printer_base: u64,
    /// Suggested base address for the first `dkeyboard` added.
    pub terminal_base: u64,
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            printer_base: defaults::PRINTER_BASE,
            terminal_base: defaults::TERMINAL_BASE,
        }
    }
}

/// Root configuration type for a simulator instance.
///
/// Constructed from `Config::default()` for the CLI's bare invocation, or
/// deserialized (via `serde_json`) from a structured config source; the
/// line-oriented `.conf` format spec.md §6 describes is handled
/// separately by [`crate::env`] and the command dispatcher, since it sets
/// runtime variables rather than startup configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General simulator-wide options.
    pub general: GeneralConfig,
    /// Physical memory layout.
    pub memory: MemoryConfig,
    /// MMIO base addresses for built-in device types.
    pub devices: DeviceDefaults,
}

impl Config {
    /// Returns the reset vector a newly created hart should start at,
    /// given [`GeneralConfig::arch`].
    #[must_use]
    pub const fn reset_vector(&self) -> u32 {
        match self.general.arch {
            Architecture::Riscv => defaults::RV_RESET_VECTOR,
            Architecture::Mips => crate::mips::RESET_VECTOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_original_msim_baseline() {
        let cfg = Config::default();
        assert_eq!(cfg.memory.ram_size, 32 * 1024 * 1024);
        assert_eq!(cfg.general.hart_count, 1);
        assert_eq!(cfg.reset_vector(), defaults::RV_RESET_VECTOR);
    }
}
