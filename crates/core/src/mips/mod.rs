//! MIPS R4000 core.
//!
//! Structured to mirror `crate::riscv`: a CP0 bank (`cp0`), a TLB
//! (`tlb`)/segmented-translation glue (`translate`), a decoder (`decode`),
//! an executor (`execute`) that returns scheduled branches and traps as
//! data, and a trap engine (`trap`). The one shape the RISC-V side doesn't
//! need is branch-delay-slot scheduling, handled in [`MipsCpu::step`].

pub mod cp0;
pub mod decode;
pub mod execute;
pub mod tlb;
pub mod trap;
pub mod translate;

use crate::common::error::Trap;
use crate::decode_cache::DecodeCache;
use crate::memory::PhysMemory;
use crate::reservation::ReservationSet;

use cp0::Cp0;
use decode::MipsOp;
use execute::BranchOutcome;
use tlb::Tlb;

/// The R4000 reset vector (`0xBFC0_0000`, the start of `kseg1` ROM).
pub const RESET_VECTOR: u32 = 0xBFC0_0000;

/// One MIPS R4000 hart's architectural state.
#[derive(Debug)]
pub struct MipsCpu {
    pub hart_id: usize,
    pub gpr: [u64; 32],
    pub pc: u32,
    pub hi: u64,
    pub lo: u64,
    pub cp0: Cp0,
    pub tlb: Tlb,
    /// Target scheduled by a branch/jump whose delay slot has not yet
    /// executed.
    pending_branch: Option<u32>,
    pub halted: bool,
}

impl MipsCpu {
    /// Creates a hart reset to power-on state.
    #[must_use]
    pub fn new(hart_id: usize, reset_vector: u32) -> Self {
        Self {
            hart_id,
            gpr: [0; 32],
            pc: reset_vector,
            hi: 0,
            lo: 0,
            cp0: Cp0::new(),
            tlb: Tlb::new(),
            pending_branch: None,
            halted: false,
        }
    }

    /// Fetches, decodes and executes one instruction, applying any branch
    /// scheduled by the *previous* instruction's delay slot once this one
    /// completes. Returns the trap, if one occurred.
    pub fn step(
        &mut self,
        mem: &mut PhysMemory,
        decode_cache: &mut DecodeCache<MipsOp>,
        reservations: &mut ReservationSet,
    ) -> Option<Trap> {
        let in_delay_slot = self.pending_branch.is_some();
        let fetch_pc = self.pc;

        if fetch_pc % 4 != 0 {
            let trap = Trap::InstructionAddressMisaligned(fetch_pc);
            trap::raise(self, trap, false, in_delay_slot);
            self.pending_branch = None;
            return Some(trap);
        }

        let paddr = match translate::translate(self, fetch_pc, crate::common::data::AccessIntent::Fetch) {
            Ok(p) => p,
            Err(trap) => {
                trap::raise(self, trap, false, in_delay_slot);
                self.pending_branch = None;
                return Some(trap);
            }
        };

        let op = decode_cache.fetch(mem, paddr, decode::decode);
        let scheduled = self.pending_branch.take();

        match execute::execute(self, op, mem, reservations) {
            Ok(BranchOutcome::None) => {
                self.pc = scheduled.unwrap_or_else(|| fetch_pc.wrapping_add(4));
                None
            }
            Ok(BranchOutcome::Taken(target)) => {
                self.pc = scheduled.unwrap_or_else(|| fetch_pc.wrapping_add(4));
                self.pending_branch = Some(target);
                None
            }
            Err(trap) => {
                let is_store = matches!(
                    op,
                    MipsOp::Store { .. }
                );
                trap::raise(self, trap, is_store, in_delay_slot);
                Some(trap)
            }
        }
    }

    /// Delivers a pending hardware interrupt, if one is enabled and
    /// unmasked. Called by the machine driver before each step, mirroring
    /// `riscv::RvCpu::try_deliver_interrupt`.
    pub fn try_deliver_interrupt(&mut self) -> Option<Trap> {
        let pending = trap::pending_interrupt(self)?;
        self.halted = false;
        trap::raise(self, pending, false, false);
        Some(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RegionKind;

    #[test]
    fn executes_addiu_and_advances_pc() {
        let mut cpu = MipsCpu::new(0, 0x8000_0000);
        let mut mem = PhysMemory::new();
        mem.map_region(0, 0x1_0000, RegionKind::Rwm);
        // addiu $t0, $zero, 7
        let word = (0x09u32 << 26) | (0 << 21) | (8 << 16) | 7;
        mem.write32(0x8000_0000, word, false);

        let mut cache = DecodeCache::new();
        let mut reservations = ReservationSet::new(1);
        let trap = cpu.step(&mut mem, &mut cache, &mut reservations);
        assert!(trap.is_none());
        assert_eq!(cpu.gpr[8], 7);
        assert_eq!(cpu.pc, 0x8000_0004);
    }

    #[test]
    fn branch_takes_effect_after_delay_slot() {
        let mut cpu = MipsCpu::new(0, 0x8000_0000);
        let mut mem = PhysMemory::new();
        mem.map_region(0, 0x1_0000, RegionKind::Rwm);

        // beq $zero, $zero, 2   (branch to pc+4+8)
        let beq = (0x04u32 << 26) | 2;
        mem.write32(0x8000_0000, beq, false);
        // addiu $t1, $zero, 1  (delay slot, must still execute)
        let addiu = (0x09u32 << 26) | (0 << 21) | (9 << 16) | 1;
        mem.write32(0x8000_0004, addiu, false);

        let mut cache = DecodeCache::new();
        let mut reservations = ReservationSet::new(1);

        cpu.step(&mut mem, &mut cache, &mut reservations);
        assert_eq!(cpu.pc, 0x8000_0004, "pc advances into the delay slot first");

        cpu.step(&mut mem, &mut cache, &mut reservations);
        assert_eq!(cpu.gpr[9], 1, "delay slot instruction executed");
        assert_eq!(cpu.pc, 0x8000_000C, "branch target applied after delay slot");
    }
}
