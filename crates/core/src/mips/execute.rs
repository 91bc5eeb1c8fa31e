//! MIPS R4000 instruction execution, including branch-delay-slot scheduling.
//!
//! Branches and jumps never change `pc` directly: they return
//! [`BranchOutcome::Taken`], and the step loop ([`super::MipsCpu::step`])
//! applies the target only after the following (delay-slot) instruction has
//! executed, matching the R4000's classic five-stage-pipeline delay slot.

use crate::common::data::AccessIntent;
use crate::common::error::Trap;
use crate::memory::PhysMemory;
use crate::reservation::ReservationSet;

use super::decode::{AluImmOp, AluOp, BranchOp, MipsOp, Width};
use super::translate::translate;
use super::MipsCpu;

/// Whether an instruction scheduled a branch to be taken after its delay
/// slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchOutcome {
    None,
    Taken(u32),
}

fn alu(op: AluOp, a: u64, b: u64) -> Result<u64, Trap> {
    Ok(match op {
        AluOp::Add => {
            let (r, overflow) = (a as i32).overflowing_add(b as i32);
            if overflow {
                return Err(Trap::IllegalInstruction(0));
            }
            r as i64 as u64
        }
        AluOp::Addu => (a as u32).wrapping_add(b as u32) as i32 as i64 as u64,
        AluOp::Sub => {
            let (r, overflow) = (a as i32).overflowing_sub(b as i32);
            if overflow {
                return Err(Trap::IllegalInstruction(0));
            }
            r as i64 as u64
        }
        AluOp::Subu => (a as u32).wrapping_sub(b as u32) as i32 as i64 as u64,
        AluOp::And => a & b,
        AluOp::Or => a | b,
        AluOp::Xor => a ^ b,
        AluOp::Nor => !(a | b),
        AluOp::Slt => u64::from((a as i64) < (b as i64)),
        AluOp::Sltu => u64::from(a < b),
        AluOp::Sll => ((a as u32) << (b as u32 & 0x1F)) as i32 as i64 as u64,
        AluOp::Srl => ((a as u32) >> (b as u32 & 0x1F)) as i32 as i64 as u64,
        AluOp::Sra => ((a as i32) >> (b as u32 & 0x1F)) as i64 as u64,
        AluOp::Sllv => ((b as u32) << (a as u32 & 0x1F)) as i32 as i64 as u64,
        AluOp::Srlv => ((b as u32) >> (a as u32 & 0x1F)) as i32 as i64 as u64,
        AluOp::Srav => ((b as i32) >> (a as u32 & 0x1F)) as i64 as u64,
    })
}

/// Executes one decoded instruction. Returns the branch it schedules (if
/// any); the caller applies that target after the delay slot.
pub fn execute(
    cpu: &mut MipsCpu,
    op: MipsOp,
    mem: &mut PhysMemory,
    reservations: &mut ReservationSet,
) -> Result<BranchOutcome, Trap> {
    let pc = cpu.pc;

    macro_rules! r {
        ($i:expr) => {
            if $i == 0 {
                0
            } else {
                cpu.gpr[$i as usize]
            }
        };
    }
    macro_rules! set {
        ($i:expr, $v:expr) => {
            if $i != 0 {
                cpu.gpr[$i as usize] = $v;
            }
        };
    }

    match op {
        MipsOp::Alu { op, rd, rs, rt, shamt } => {
            let a = match op {
                AluOp::Sll | AluOp::Srl | AluOp::Sra => u64::from(shamt),
                _ => r!(rs),
            };
            let b = r!(rt);
            set!(rd, alu(op, a, b)?);
        }
        MipsOp::AluImm { op, rt, rs, imm } => {
            let a = r!(rs);
            let b = imm as i64 as u64;
            let v = match op {
                AluImmOp::Addi => alu(AluOp::Add, a, b)?,
                AluImmOp::Addiu => alu(AluOp::Addu, a, b)?,
                AluImmOp::Slti => alu(AluOp::Slt, a, b)?,
                AluImmOp::Sltiu => alu(AluOp::Sltu, a, b)?,
                AluImmOp::Andi => a & (imm as u64 & 0xFFFF),
                AluImmOp::Ori => a | (imm as u64 & 0xFFFF),
                AluImmOp::Xori => a ^ (imm as u64 & 0xFFFF),
                AluImmOp::Lui => (imm as u32 as u64) << 16,
            };
            set!(rt, v);
        }
        MipsOp::Branch { op, rs, rt, imm, link } => {
            let a = r!(rs) as i64;
            let b = r!(rt) as i64;
            let taken = match op {
                BranchOp::Eq => a == b,
                BranchOp::Ne => a != b,
                BranchOp::Lez => a <= 0,
                BranchOp::Gtz => a > 0,
                BranchOp::Ltz | BranchOp::LtzAl => a < 0,
                BranchOp::Gez | BranchOp::GezAl => a >= 0,
            };
            if link {
                set!(31, u64::from(pc.wrapping_add(8)));
            }
            if taken {
                let target = pc.wrapping_add(4).wrapping_add((imm as u32) << 2);
                return Ok(BranchOutcome::Taken(target));
            }
        }
        MipsOp::Jump { target, link } => {
            if link {
                set!(31, u64::from(pc.wrapping_add(8)));
            }
            let dest = (pc.wrapping_add(4) & 0xF000_0000) | (target << 2);
            return Ok(BranchOutcome::Taken(dest));
        }
        MipsOp::Jr { rs } => {
            let target = r!(rs) as u32;
            return Ok(BranchOutcome::Taken(target));
        }
        MipsOp::Jalr { rd, rs } => {
            let target = r!(rs) as u32;
            set!(rd, u64::from(pc.wrapping_add(8)));
            return Ok(BranchOutcome::Taken(target));
        }
        MipsOp::Load { rt, rs, imm, width, signed } => {
            let vaddr = (r!(rs) as u32).wrapping_add(imm as u32);
            let align = match width {
                Width::Byte => 1,
                Width::Half => 2,
                Width::Word => 4,
                Width::Doubleword => 8,
            };
            if vaddr % align != 0 {
                return Err(Trap::LoadAddressMisaligned(vaddr));
            }
            let paddr = translate(cpu, vaddr, AccessIntent::Load)?;
            let value: u64 = match (width, signed) {
                (Width::Byte, true) => mem.read8(paddr, true) as i8 as i64 as u64,
                (Width::Byte, false) => u64::from(mem.read8(paddr, true)),
                (Width::Half, true) => mem.read16(paddr, true) as i16 as i64 as u64,
                (Width::Half, false) => u64::from(mem.read16(paddr, true)),
                (Width::Word, true) => mem.read32(paddr, true) as i32 as i64 as u64,
                (Width::Word, false) => u64::from(mem.read32(paddr, true)),
                (Width::Doubleword, _) => mem.read64(paddr, true),
            };
            set!(rt, value);
        }
        MipsOp::Store { rt, rs, imm, width } => {
            let vaddr = (r!(rs) as u32).wrapping_add(imm as u32);
            let align = match width {
                Width::Byte => 1,
                Width::Half => 2,
                Width::Word => 4,
                Width::Doubleword => 8,
            };
            if vaddr % align != 0 {
                return Err(Trap::StoreAddressMisaligned(vaddr));
            }
            let paddr = translate(cpu, vaddr, AccessIntent::Store)?;
            let value = r!(rt);
            let ok = match width {
                Width::Byte => mem.write8(paddr, value as u8, true),
                Width::Half => mem.write16(paddr, value as u16, true),
                Width::Word => mem.write32(paddr, value as u32, true),
                Width::Doubleword => mem.write64(paddr, value, true),
            };
            if !ok {
                return Err(Trap::StoreAccessFault(vaddr));
            }
            reservations.notify_store(paddr);
        }
        MipsOp::MfHi { rd } => set!(rd, cpu.hi),
        MipsOp::MfLo { rd } => set!(rd, cpu.lo),
        MipsOp::MtHi { rs } => cpu.hi = r!(rs),
        MipsOp::MtLo { rs } => cpu.lo = r!(rs),
        MipsOp::Mult { rs, rt, signed } => {
            let a = r!(rs) as u32;
            let b = r!(rt) as u32;
            let product: u64 = if signed {
                ((a as i32 as i64) * (b as i32 as i64)) as u64
            } else {
                u64::from(a) * u64::from(b)
            };
            cpu.lo = product as u32 as i32 as i64 as u64;
            cpu.hi = (product >> 32) as u32 as i32 as i64 as u64;
        }
        MipsOp::Div { rs, rt, signed } => {
            let a = r!(rs) as u32;
            let b = r!(rt) as u32;
            if b == 0 {
                cpu.lo = 0;
                cpu.hi = 0;
            } else if signed {
                cpu.lo = ((a as i32).wrapping_div(b as i32)) as i64 as u64;
                cpu.hi = ((a as i32).wrapping_rem(b as i32)) as i64 as u64;
            } else {
                cpu.lo = u64::from(a / b);
                cpu.hi = u64::from(a % b);
            }
        }
        MipsOp::Syscall => {
            return Err(Trap::EnvironmentCallFromMMode);
        }
        MipsOp::Break => return Err(Trap::Breakpoint(pc)),
        MipsOp::Mfc0 { rt, rd } => set!(rt, cpu.cp0.read(rd) as i32 as i64 as u64),
        MipsOp::Mtc0 { rt, rd } => cpu.cp0.write(rd, r!(rt) as u32),
        MipsOp::Tlbr => {
            let fields = cpu.tlb.read_entry(cpu.cp0.index as usize);
            super::translate::load_entry_into_cp0(cpu, fields);
        }
        MipsOp::Tlbwi => {
            let fields = super::translate::entry_from_cp0(cpu);
            cpu.tlb.write_entry(cpu.cp0.index as usize, fields);
        }
        MipsOp::Tlbwr => {
            let fields = super::translate::entry_from_cp0(cpu);
            let index = (cpu.cp0.random as usize) % 32;
            cpu.tlb.write_entry(index, fields);
        }
        MipsOp::Tlbp => {
            let asid = (cpu.cp0.entry_hi & 0xFF) as u8;
            let vpn2 = cpu.cp0.entry_hi >> 13;
            cpu.cp0.index = cpu.tlb.probe(vpn2, asid).map_or(1 << 31, |i| i as u32);
        }
        MipsOp::Eret => {
            super::trap::do_eret(cpu);
            return Ok(BranchOutcome::None);
        }
        MipsOp::Illegal => return Err(Trap::IllegalInstruction(pc)),
    }

    Ok(BranchOutcome::None)
}
