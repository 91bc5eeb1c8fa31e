//! msim-rs simulator core.
//!
//! This crate implements the execution engine of an interactive
//! instruction-set simulator for MIPS R4000 and RISC-V RV32IMA, covering:
//! 1. **Machine:** the aggregate (C10) owning every hart, physical memory,
//!    the decode cache, the device registry, the breakpoint set, and the
//!    LL/SC reservation set, and the round-robin step loop over harts.
//! 2. **Memory:** a frame-backed physical address space (C1) with a merged
//!    memory-mapped device registry (C2), both invalidation-aware of the
//!    decode cache (C3).
//! 3. **Cores:** RV32IMA (CSRs, Sv32, RV32IMA execute/decode/trap) and MIPS
//!    R4000 (CP0, software TLB, branch-delay scheduling) processor models.
//! 4. **Debugging:** a breakpoint engine (C8), a command language
//!    (tokenizer plus a tagged-enum dispatcher), and stub seams for a
//!    remote GDB stub and a disassembler, both out of this crate's scope.
//!
//! Out of scope (spec.md §1): line editing, config-file syntax beyond
//! feeding lines to the command dispatcher, per-device protocol fidelity
//! beyond a read/write/step contract, and disassembly formatting fidelity.

/// Machine-independent breakpoint engine (C8): PC and memory-access
/// breakpoints, consulted by every fetch and access.
pub mod breakpoint;
/// Command tokenizer and the system command table (spec.md §6).
pub mod command;
/// Address types, constants, access classification, and error types shared
/// by both architectures.
pub mod common;
/// Hierarchical, `serde`-deserializable startup configuration.
pub mod config;
/// Interface stubs for a remote debugger (out of scope beyond a seam).
pub mod debugger;
/// Decode cache (C3): per-frame table of pre-decoded instruction handlers.
pub mod decode_cache;
/// Built-in memory-mapped device types and the device registry (C2).
pub mod devices;
/// Best-effort instruction disassembly for `dumpins`.
pub mod disasm;
/// Runtime-settable named variables (spec.md §6 `set`/`unset`).
pub mod env;
/// The machine aggregate (C10): multiplexes steps across harts and
/// dispatches the interactive command language.
pub mod machine;
/// MIPS R4000 processor core: CP0, TLB, decode/execute/trap.
pub mod mips;
/// Physical memory (C1), merged with the device registry (C2) into one bus.
pub mod memory;
/// LL/SC reservation set (C9).
pub mod reservation;
/// RISC-V RV32IMA processor core: CSRs, Sv32 MMU, decode/execute/trap.
pub mod riscv;

pub use breakpoint::{BreakpointKind, BreakpointSet};
pub use common::error::{SimError, Trap};
pub use config::Config;
pub use machine::Machine;
