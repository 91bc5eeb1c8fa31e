//! MIPS R4000 segmented address translation: routes `kseg0`/`kseg1`
//! through a fixed unmapped window and everything else through the TLB
//! (C4, MIPS side).

use crate::common::data::AccessIntent;
use crate::common::error::Trap;

use super::tlb::EntryFields;
use super::MipsCpu;

const KSEG0_BASE: u32 = 0x8000_0000;
const KSEG1_BASE: u32 = 0xA000_0000;
const KSEG2_BASE: u32 = 0xC000_0000;
const UNMAPPED_PHYS_MASK: u32 = 0x1FFF_FFFF;

/// Translates a MIPS virtual address to a physical address, routing
/// `kseg0`/`kseg1` through the fixed unmapped window (no TLB lookup) and
/// `kuseg`/`kseg2`/`kseg3` through the TLB.
pub fn translate(cpu: &MipsCpu, vaddr: u32, intent: AccessIntent) -> Result<u64, Trap> {
    if (KSEG0_BASE..KSEG2_BASE).contains(&vaddr) {
        return Ok(u64::from(vaddr & UNMAPPED_PHYS_MASK));
    }
    let asid = (cpu.cp0.entry_hi & 0xFF) as u8;
    cpu.tlb.translate(vaddr, asid, intent).map(u64::from)
}

/// Populates `EntryHi`/`EntryLo0`/`EntryLo1` from a TLB entry (used by
/// `tlbr`).
pub fn load_entry_into_cp0(cpu: &mut MipsCpu, fields: EntryFields) {
    cpu.cp0.entry_hi = (fields.vpn2 << 13) | u32::from(fields.asid);
    cpu.cp0.entry_lo0 = encode_lo(fields.pfn0, fields.valid0, fields.dirty0, fields.global);
    cpu.cp0.entry_lo1 = encode_lo(fields.pfn1, fields.valid1, fields.dirty1, fields.global);
}

/// Builds a TLB entry from the current `EntryHi`/`EntryLo0`/`EntryLo1`
/// (used by `tlbwi`/`tlbwr`).
#[must_use]
pub fn entry_from_cp0(cpu: &MipsCpu) -> EntryFields {
    let (pfn0, valid0, dirty0, g0) = decode_lo(cpu.cp0.entry_lo0);
    let (pfn1, valid1, dirty1, g1) = decode_lo(cpu.cp0.entry_lo1);
    EntryFields {
        vpn2: cpu.cp0.entry_hi >> 13,
        asid: (cpu.cp0.entry_hi & 0xFF) as u8,
        global: g0 && g1,
        pfn0,
        valid0,
        dirty0,
        pfn1,
        valid1,
        dirty1,
    }
}

const LO_GLOBAL: u32 = 1 << 0;
const LO_VALID: u32 = 1 << 1;
const LO_DIRTY: u32 = 1 << 2;
const LO_PFN_SHIFT: u32 = 6;

fn encode_lo(pfn: u32, valid: bool, dirty: bool, global: bool) -> u32 {
    (pfn << LO_PFN_SHIFT)
        | if valid { LO_VALID } else { 0 }
        | if dirty { LO_DIRTY } else { 0 }
        | if global { LO_GLOBAL } else { 0 }
}

fn decode_lo(lo: u32) -> (u32, bool, bool, bool) {
    (
        lo >> LO_PFN_SHIFT,
        lo & LO_VALID != 0,
        lo & LO_DIRTY != 0,
        lo & LO_GLOBAL != 0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mips::MipsCpu;

    #[test]
    fn kseg0_is_unmapped_and_direct_mapped() {
        let cpu = MipsCpu::new(0, 0xBFC0_0000);
        let pa = translate(&cpu, 0x8000_1000, AccessIntent::Fetch).unwrap();
        assert_eq!(pa, 0x0000_1000);
    }

    #[test]
    fn kseg1_is_unmapped_and_direct_mapped() {
        let cpu = MipsCpu::new(0, 0xBFC0_0000);
        let pa = translate(&cpu, 0xA000_2000, AccessIntent::Fetch).unwrap();
        assert_eq!(pa, 0x0000_2000);
    }
}
