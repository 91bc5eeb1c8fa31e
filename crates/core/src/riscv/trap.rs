//! RV32 trap/privilege engine: cause-code encoding, M/S delegation, and
//! `mret`/`sret` privilege restoration.

use crate::common::error::Trap;

use super::csr::{interrupt_bits, mstatus_bits};
use super::mmu::Privilege;
use super::RvCpu;

/// Encodes a [`Trap`] as an RV `mcause`/`scause` value (interrupt bit in
/// bit 31, exception/interrupt code in the low bits).
#[must_use]
pub fn cause_code(trap: Trap) -> u32 {
    const INTERRUPT_BIT: u32 = 1 << 31;
    match trap {
        Trap::InstructionAddressMisaligned(_) => 0,
        Trap::InstructionAccessFault(_) => 1,
        Trap::IllegalInstruction(_) => 2,
        Trap::Breakpoint(_) => 3,
        Trap::LoadAddressMisaligned(_) => 4,
        Trap::LoadAccessFault(_) => 5,
        Trap::StoreAddressMisaligned(_) => 6,
        Trap::StoreAccessFault(_) => 7,
        Trap::EnvironmentCallFromUMode => 8,
        Trap::EnvironmentCallFromSMode => 9,
        Trap::EnvironmentCallFromMMode => 11,
        Trap::InstructionPageFault(_) => 12,
        Trap::LoadPageFault(_) => 13,
        Trap::StorePageFault(_) => 15,
        Trap::SupervisorSoftwareInterrupt => INTERRUPT_BIT | 1,
        Trap::MachineSoftwareInterrupt => INTERRUPT_BIT | 3,
        Trap::SupervisorTimerInterrupt => INTERRUPT_BIT | 5,
        Trap::MachineTimerInterrupt => INTERRUPT_BIT | 7,
        Trap::SupervisorExternalInterrupt => INTERRUPT_BIT | 9,
        Trap::MachineExternalInterrupt => INTERRUPT_BIT | 11,
        // MIPS-only variants never reach an RV hart's trap engine.
        Trap::TlbRefill(_) | Trap::TlbInvalid(_) | Trap::TlbModified(_) => unreachable!(
            "MIPS trap variant routed to the RISC-V trap engine"
        ),
    }
}

fn target_privilege(cpu: &RvCpu, trap: Trap, code: u32) -> Privilege {
    if cpu.priv_mode == Privilege::Machine {
        return Privilege::Machine;
    }
    let bit = 1u32 << (code & 0x1F);
    let delegated = if trap.is_interrupt() {
        cpu.csr.mideleg & bit != 0
    } else {
        cpu.csr.medeleg & bit != 0
    };
    if delegated {
        Privilege::Supervisor
    } else {
        Privilege::Machine
    }
}

fn priv_to_mpp(p: Privilege) -> u32 {
    match p {
        Privilege::User => 0b00,
        Privilege::Supervisor => 0b01,
        Privilege::Machine => 0b11,
    }
}

/// Takes `trap`, updating CSR state and `cpu.pc` to the appropriate trap
/// vector, and returns the hart's new privilege level.
pub fn raise(cpu: &mut RvCpu, trap: Trap) -> Privilege {
    let code = cause_code(trap);
    let target = target_privilege(cpu, trap, code);
    let tval = trap.tval();

    match target {
        Privilege::Supervisor => {
            cpu.csr.sepc = cpu.pc;
            cpu.csr.scause = code;
            cpu.csr.stval = tval;
            let sie = cpu.csr.mstatus & mstatus_bits::SIE != 0;
            cpu.csr.mstatus = set_bit(cpu.csr.mstatus, mstatus_bits::SPIE, sie);
            cpu.csr.mstatus = set_bit(cpu.csr.mstatus, mstatus_bits::SIE, false);
            cpu.csr.mstatus = set_bit(cpu.csr.mstatus, mstatus_bits::SPP, cpu.priv_mode != Privilege::User);
            let base = cpu.csr.stvec & !0b11;
            cpu.pc = vectored_target(base, cpu.csr.stvec, code, trap.is_interrupt());
        }
        Privilege::Machine | Privilege::User => {
            cpu.csr.mepc = cpu.pc;
            cpu.csr.mcause = code;
            cpu.csr.mtval = tval;
            let mie = cpu.csr.mstatus & mstatus_bits::MIE != 0;
            cpu.csr.mstatus = set_bit(cpu.csr.mstatus, mstatus_bits::MPIE, mie);
            cpu.csr.mstatus = set_bit(cpu.csr.mstatus, mstatus_bits::MIE, false);
            cpu.csr.mstatus = (cpu.csr.mstatus & !mstatus_bits::MPP_MASK)
                | (priv_to_mpp(cpu.priv_mode) << mstatus_bits::MPP_SHIFT);
            let base = cpu.csr.mtvec & !0b11;
            cpu.pc = vectored_target(base, cpu.csr.mtvec, code, trap.is_interrupt());
        }
    }
    cpu.priv_mode = target;
    target
}

fn set_bit(value: u32, mask: u32, set: bool) -> u32 {
    if set {
        value | mask
    } else {
        value & !mask
    }
}

fn vectored_target(base: u32, tvec: u32, code: u32, is_interrupt: bool) -> u32 {
    if is_interrupt && tvec & 0b11 == 1 {
        base.wrapping_add(4 * (code & 0x7FFF_FFFF))
    } else {
        base
    }
}

/// `mret`: restores privilege/interrupt-enable state from `mstatus` and
/// returns to `mepc`.
pub fn do_mret(cpu: &mut RvCpu) {
    let mpp = (cpu.csr.mstatus & mstatus_bits::MPP_MASK) >> mstatus_bits::MPP_SHIFT;
    let mpie = cpu.csr.mstatus & mstatus_bits::MPIE != 0;
    cpu.csr.mstatus = set_bit(cpu.csr.mstatus, mstatus_bits::MIE, mpie);
    cpu.csr.mstatus = set_bit(cpu.csr.mstatus, mstatus_bits::MPIE, true);
    cpu.csr.mstatus &= !mstatus_bits::MPP_MASK;
    cpu.priv_mode = match mpp {
        0b00 => Privilege::User,
        0b01 => Privilege::Supervisor,
        _ => Privilege::Machine,
    };
    cpu.pc = cpu.csr.mepc;
}

/// `sret`: restores privilege/interrupt-enable state from `sstatus` and
/// returns to `sepc`.
pub fn do_sret(cpu: &mut RvCpu) {
    let spp = cpu.csr.mstatus & mstatus_bits::SPP != 0;
    let spie = cpu.csr.mstatus & mstatus_bits::SPIE != 0;
    cpu.csr.mstatus = set_bit(cpu.csr.mstatus, mstatus_bits::SIE, spie);
    cpu.csr.mstatus = set_bit(cpu.csr.mstatus, mstatus_bits::SPIE, true);
    cpu.csr.mstatus = set_bit(cpu.csr.mstatus, mstatus_bits::SPP, false);
    cpu.priv_mode = if spp { Privilege::Supervisor } else { Privilege::User };
    cpu.pc = cpu.csr.sepc;
}

/// Returns the highest-priority pending, enabled interrupt for `cpu`, if
/// any, following the machine-then-supervisor, external-timer-software
/// priority order of the privileged spec.
#[must_use]
pub fn pending_interrupt(cpu: &RvCpu) -> Option<Trap> {
    let m_enabled = cpu.priv_mode != Privilege::Machine || cpu.csr.mstatus & mstatus_bits::MIE != 0;
    let s_enabled = cpu.priv_mode == Privilege::User
        || (cpu.priv_mode == Privilege::Supervisor && cpu.csr.mstatus & mstatus_bits::SIE != 0);

    let pending = cpu.csr.effective_mip() & cpu.csr.mie;
    let check = |bit: u32, to_s: bool, trap: Trap| -> Option<Trap> {
        if pending & bit == 0 {
            return None;
        }
        let delegated = cpu.csr.mideleg & bit != 0;
        let enabled = if delegated { to_s && s_enabled } else { m_enabled };
        enabled.then_some(trap)
    };

    check(interrupt_bits::MEIP, false, Trap::MachineExternalInterrupt)
        .or_else(|| check(interrupt_bits::MSIP, false, Trap::MachineSoftwareInterrupt))
        .or_else(|| check(interrupt_bits::MTIP, false, Trap::MachineTimerInterrupt))
        .or_else(|| check(interrupt_bits::SEIP, true, Trap::SupervisorExternalInterrupt))
        .or_else(|| check(interrupt_bits::SSIP, true, Trap::SupervisorSoftwareInterrupt))
        .or_else(|| check(interrupt_bits::STIP, true, Trap::SupervisorTimerInterrupt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::riscv::csr::CsrFile;

    fn cpu() -> RvCpu {
        RvCpu {
            hart_id: 0,
            gpr: [0; 32],
            pc: 0x8000_0000,
            csr: CsrFile::new(0),
            priv_mode: Privilege::User,
            reservation_addr: None,
            halted: false,
        }
    }

    #[test]
    fn undelegated_trap_goes_to_machine_mode() {
        let mut cpu = cpu();
        cpu.csr.mtvec = 0x8000_1000;
        let target = raise(&mut cpu, Trap::IllegalInstruction(0x1234));
        assert_eq!(target, Privilege::Machine);
        assert_eq!(cpu.pc, 0x8000_1000);
        assert_eq!(cpu.csr.mcause, 2);
        assert_eq!(cpu.priv_mode, Privilege::Machine);
    }

    #[test]
    fn delegated_trap_goes_to_supervisor_mode() {
        let mut cpu = cpu();
        cpu.csr.medeleg = 1 << 2;
        cpu.csr.stvec = 0x8000_2000;
        let target = raise(&mut cpu, Trap::IllegalInstruction(0));
        assert_eq!(target, Privilege::Supervisor);
        assert_eq!(cpu.pc, 0x8000_2000);
        assert_eq!(cpu.priv_mode, Privilege::Supervisor);
    }

    #[test]
    fn mret_restores_privilege_and_pc() {
        let mut cpu = cpu();
        cpu.priv_mode = Privilege::Machine;
        cpu.csr.mepc = 0x8000_3000;
        cpu.csr.mstatus = (0b01 << mstatus_bits::MPP_SHIFT) | mstatus_bits::MPIE;
        do_mret(&mut cpu);
        assert_eq!(cpu.pc, 0x8000_3000);
        assert_eq!(cpu.priv_mode, Privilege::Supervisor);
        assert!(cpu.csr.mstatus & mstatus_bits::MIE != 0);
    }
}
