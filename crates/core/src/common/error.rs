//! Architectural traps and host-level errors.
//!
//! The two are deliberately different types (Design Notes, "Exception as
//! return value"): a [`Trap`] is architectural state returned by instruction
//! handlers and resolved by the trap engine — it is never propagated with
//! `?`. A [`SimError`] is a host-level failure (bad config, I/O, a command
//! that can't be carried out) propagated the normal way.

use std::fmt;

/// Architectural exceptions and interrupts, shared by both the RISC-V and
/// MIPS cores. Not every variant applies to every architecture; each core's
/// trap engine maps the subset it raises onto its own cause-code encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trap {
    /// Instruction-fetch address is not naturally aligned.
    InstructionAddressMisaligned(u32),
    /// Fetch hit an EXC memory region or an unmapped address.
    InstructionAccessFault(u32),
    /// The fetched 32-bit word does not decode to a known instruction.
    IllegalInstruction(u32),
    /// A `dumpins`/simulator/debugger breakpoint instruction, or a PC
    /// breakpoint hit at fetch time.
    Breakpoint(u32),
    /// Load address is not naturally aligned for its width.
    LoadAddressMisaligned(u32),
    /// Load hit an EXC memory region.
    LoadAccessFault(u32),
    /// Store/AMO address is not naturally aligned for its width.
    StoreAddressMisaligned(u32),
    /// Store/AMO hit an EXC region, or (per the resolved Open Question in
    /// SPEC_FULL.md §23) a ROM region.
    StoreAccessFault(u32),
    /// `ecall`/`syscall` from user mode.
    EnvironmentCallFromUMode,
    /// `ecall` from supervisor mode (RV only).
    EnvironmentCallFromSMode,
    /// `ecall`/`syscall` from machine/kernel mode.
    EnvironmentCallFromMMode,
    /// RV Sv32 instruction page fault.
    InstructionPageFault(u32),
    /// RV Sv32 load page fault.
    LoadPageFault(u32),
    /// RV Sv32 store/AMO page fault.
    StorePageFault(u32),
    /// MIPS TLB refill exception (no matching TLB entry).
    TlbRefill(u32),
    /// MIPS TLB invalid exception (matching entry, but valid bit clear).
    TlbInvalid(u32),
    /// MIPS TLB modified exception (store to a read-only matching entry).
    TlbModified(u32),
    /// Supervisor software interrupt.
    SupervisorSoftwareInterrupt,
    /// Machine software interrupt.
    MachineSoftwareInterrupt,
    /// Supervisor timer interrupt.
    SupervisorTimerInterrupt,
    /// Machine timer interrupt.
    MachineTimerInterrupt,
    /// Supervisor external interrupt.
    SupervisorExternalInterrupt,
    /// Machine external interrupt.
    MachineExternalInterrupt,
}

impl Trap {
    /// Returns `true` if this trap is an interrupt (asynchronous), as
    /// opposed to a synchronous exception raised by the instruction itself.
    #[must_use]
    pub const fn is_interrupt(self) -> bool {
        matches!(
            self,
            Self::SupervisorSoftwareInterrupt
                | Self::MachineSoftwareInterrupt
                | Self::SupervisorTimerInterrupt
                | Self::MachineTimerInterrupt
                | Self::SupervisorExternalInterrupt
                | Self::MachineExternalInterrupt
        )
    }

    /// Returns the trap-value (`tval`/`BadVAddr`) payload for this trap, if
    /// it carries an address or instruction encoding.
    #[must_use]
    pub const fn tval(self) -> u32 {
        match self {
            Self::InstructionAddressMisaligned(a)
            | Self::InstructionAccessFault(a)
            | Self::IllegalInstruction(a)
            | Self::Breakpoint(a)
            | Self::LoadAddressMisaligned(a)
            | Self::LoadAccessFault(a)
            | Self::StoreAddressMisaligned(a)
            | Self::StoreAccessFault(a)
            | Self::InstructionPageFault(a)
            | Self::LoadPageFault(a)
            | Self::StorePageFault(a)
            | Self::TlbRefill(a)
            | Self::TlbInvalid(a)
            | Self::TlbModified(a) => a,
            _ => 0,
        }
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for Trap {}

/// Host-level errors: failures that are not part of the simulated
/// architecture's own fault model (spec.md §7).
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A config-file line failed to parse or execute.
    #[error("{path}:{line}: {message}")]
    Config {
        /// Path to the offending config file.
        path: String,
        /// 1-based line number.
        line: usize,
        /// Human-readable diagnostic.
        message: String,
    },

    /// I/O failure reading a config file or writing a redirected device
    /// output file.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `add` was given a device name that collides with a command name or
    /// an existing device.
    #[error("device name \"{0}\" is already in use")]
    NameConflict(String),

    /// An unknown device type was requested via `add`.
    #[error("unknown device type \"{0}\"")]
    UnknownDeviceType(String),

    /// Address arithmetic in a command overflowed or underflowed.
    #[error("address arithmetic overflow in command")]
    AddressOverflow,

    /// A command failed for a reason specific to that command (bad
    /// argument count, unparseable token, unknown breakpoint address, ...).
    #[error("{0}")]
    Command(String),
}
