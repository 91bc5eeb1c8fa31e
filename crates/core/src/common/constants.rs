//! Global system constants.

/// Frame size in bytes (spec.md §3: "a fixed-size (4096 B) block of bytes").
pub const FRAME_SIZE: u64 = 4096;

/// Mask for extracting the in-frame offset from a physical address.
pub const FRAME_MASK: u64 = FRAME_SIZE - 1;

/// Width of the physical address space in bits (spec.md §3).
pub const PHYS_ADDR_BITS: u32 = 36;

/// Value returned for reads to EXC (no-access) physical regions, and for
/// reads that land outside any mapped region (spec.md §4.1).
pub const DEFAULT_MEMORY_VALUE32: u32 = 0xFFFF_FFFF;

/// Number of simulator steps between `step4` device ticks (spec.md §4.2).
pub const STEP4_DIVIDER: u64 = 4;

/// Default Sv32 page size (4 KiB).
pub const PAGE_SIZE: u64 = 4096;

/// Number of bits in a page offset (Sv32 and MIPS TLB agree on 4 KiB pages).
pub const PAGE_SHIFT: u32 = 12;
