//! MIPS R4000 trap/privilege engine.
//!
//! Exception entry always targets kernel mode at a fixed vector (R4000 has
//! no delegation concept — every exception is taken by the kernel), unlike
//! the RV side's M/S split. `EXL` gates re-entrancy: a second exception
//! while `EXL` is set does not re-save `EPC`/`Cause.BD`.

use crate::common::error::Trap;

use super::cp0::{cause_bits, status_bits};
use super::MipsCpu;

const VECTOR_GENERAL: u32 = 0x8000_0180;
const VECTOR_TLB_REFILL: u32 = 0x8000_0000;

/// Encodes a [`Trap`] as a MIPS `ExcCode` (Cause register bits 6:2).
/// `is_store` disambiguates TLB load/fetch vs. store causes, since a
/// single [`Trap::TlbRefill`]/[`Trap::TlbInvalid`] variant covers both.
#[must_use]
pub fn exc_code(trap: Trap, is_store: bool) -> u32 {
    match trap {
        Trap::TlbModified(_) => 1,
        Trap::TlbRefill(_) | Trap::TlbInvalid(_) => {
            if is_store {
                3
            } else {
                2
            }
        }
        Trap::InstructionAddressMisaligned(_) | Trap::InstructionAccessFault(_) => 4,
        Trap::LoadAddressMisaligned(_) | Trap::LoadAccessFault(_) => 4,
        Trap::StoreAddressMisaligned(_) | Trap::StoreAccessFault(_) => 5,
        Trap::EnvironmentCallFromUMode | Trap::EnvironmentCallFromSMode | Trap::EnvironmentCallFromMMode => 8,
        Trap::Breakpoint(_) => 9,
        Trap::IllegalInstruction(_) => 10,
        Trap::MachineSoftwareInterrupt
        | Trap::SupervisorSoftwareInterrupt
        | Trap::MachineTimerInterrupt
        | Trap::SupervisorTimerInterrupt
        | Trap::MachineExternalInterrupt
        | Trap::SupervisorExternalInterrupt => 0,
        Trap::InstructionPageFault(_) | Trap::LoadPageFault(_) | Trap::StorePageFault(_) => {
            unreachable!("RV Sv32 trap variant routed to the MIPS trap engine")
        }
    }
}

/// Takes `trap`, updating CP0 state and `cpu.pc` to the exception vector.
/// `is_store` disambiguates TLB exception direction; `in_delay_slot`
/// records `Cause.BD` so the handler can recover the faulting instruction.
pub fn raise(cpu: &mut MipsCpu, trap: Trap, is_store: bool, in_delay_slot: bool) {
    let code = exc_code(trap, is_store);
    let already_in_exception = cpu.cp0.status & status_bits::EXL != 0;

    if !already_in_exception {
        cpu.cp0.epc = if in_delay_slot { cpu.pc.wrapping_sub(4) } else { cpu.pc };
        cpu.cp0.cause = (cpu.cp0.cause & !cause_bits::BD) | if in_delay_slot { cause_bits::BD } else { 0 };
    }
    cpu.cp0.cause = (cpu.cp0.cause & !cause_bits::EXC_CODE_MASK) | (code << cause_bits::EXC_CODE_SHIFT);
    cpu.cp0.status |= status_bits::EXL;

    match trap {
        Trap::TlbRefill(addr) | Trap::TlbInvalid(addr) | Trap::TlbModified(addr) => {
            cpu.cp0.bad_vaddr = addr;
        }
        Trap::InstructionAddressMisaligned(addr)
        | Trap::InstructionAccessFault(addr)
        | Trap::LoadAddressMisaligned(addr)
        | Trap::LoadAccessFault(addr)
        | Trap::StoreAddressMisaligned(addr)
        | Trap::StoreAccessFault(addr) => cpu.cp0.bad_vaddr = addr,
        _ => {}
    }

    cpu.pc = if matches!(trap, Trap::TlbRefill(_)) && !already_in_exception {
        VECTOR_TLB_REFILL
    } else {
        VECTOR_GENERAL
    };
}

/// `eret`: leaves exception level and resumes at `EPC`.
pub fn do_eret(cpu: &mut MipsCpu) {
    cpu.cp0.status &= !status_bits::EXL;
    cpu.pc = cpu.cp0.epc;
}

/// Returns the hardware interrupt pending for `cpu`, if `Status.IE` is set,
/// the hart is not already inside an exception (`EXL`/`ERL`), and at least
/// one of `Cause.IP` is both pending and unmasked by `Status.IM`. Mirrors
/// `riscv::trap::pending_interrupt`'s shape, but R4000 has a single flat
/// interrupt mask rather than a per-privilege mie/mip split.
#[must_use]
pub fn pending_interrupt(cpu: &MipsCpu) -> Option<Trap> {
    let enabled = cpu.cp0.status & status_bits::IE != 0
        && cpu.cp0.status & (status_bits::EXL | status_bits::ERL) == 0;
    if !enabled {
        return None;
    }
    let im = (cpu.cp0.status & status_bits::IM_MASK) >> status_bits::IM_SHIFT;
    let ip = (cpu.cp0.cause & cause_bits::IP_MASK) >> cause_bits::IP_SHIFT;
    if ip & im == 0 {
        return None;
    }
    // IP7 (the hardware timer line driven by Count/Compare) takes priority
    // here since it is the only line this core drives internally; external
    // device lines (IP2-IP6, routed through `dintc`) are checked next in
    // ascending order.
    if ip & im & (1 << 7) != 0 {
        return Some(Trap::MachineTimerInterrupt);
    }
    for line in 2..7 {
        if ip & im & (1 << line) != 0 {
            return Some(Trap::MachineExternalInterrupt);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_saves_epc_and_sets_exl() {
        let mut cpu = MipsCpu::new(0, 0xBFC0_0000);
        cpu.pc = 0x8000_1000;
        raise(&mut cpu, Trap::IllegalInstruction(0), false, false);
        assert_eq!(cpu.cp0.epc, 0x8000_1000);
        assert_eq!(cpu.cp0.status & status_bits::EXL, status_bits::EXL);
        assert_eq!(cpu.pc, VECTOR_GENERAL);
    }

    #[test]
    fn delay_slot_exception_saves_branch_pc_and_sets_bd() {
        let mut cpu = MipsCpu::new(0, 0xBFC0_0000);
        cpu.pc = 0x8000_1004;
        raise(&mut cpu, Trap::IllegalInstruction(0), false, true);
        assert_eq!(cpu.cp0.epc, 0x8000_1000);
        assert_eq!(cpu.cp0.cause & cause_bits::BD, cause_bits::BD);
    }

    #[test]
    fn eret_clears_exl_and_restores_pc() {
        let mut cpu = MipsCpu::new(0, 0xBFC0_0000);
        cpu.cp0.status |= status_bits::EXL;
        cpu.cp0.epc = 0x8000_2000;
        do_eret(&mut cpu);
        assert_eq!(cpu.pc, 0x8000_2000);
        assert_eq!(cpu.cp0.status & status_bits::EXL, 0);
    }
}
