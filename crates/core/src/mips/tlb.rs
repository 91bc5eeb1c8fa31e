//! MIPS R4000 TLB-based address translation (C4, MIPS side).
//!
//! Each entry maps a pair of adjacent 4 KiB pages (even/odd, selected by
//! vaddr bit 12), matching the R4000's `EntryHi`/`EntryLo0`/`EntryLo1`
//! layout. Variable page sizes (`PageMask`) are not modeled — every entry
//! covers a fixed 4 KiB pair — which is a deliberate reduction from the
//! full R4000 TLB (spec.md Non-goals: no cache-hierarchy-level fidelity
//! beyond the decode cache; page-size variants fall under the same
//! simplification).

use crate::common::data::AccessIntent;
use crate::common::error::Trap;

const TLB_ENTRIES: usize = 32;

#[derive(Clone, Copy, Debug, Default)]
struct HalfPage {
    pfn: u32,
    valid: bool,
    dirty: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct TlbEntry {
    vpn2: u32,
    asid: u8,
    global: bool,
    lo0: HalfPage,
    lo1: HalfPage,
}

/// A fixed-size, fully-associative TLB.
#[derive(Debug)]
pub struct Tlb {
    entries: [TlbEntry; TLB_ENTRIES],
}

impl Default for Tlb {
    fn default() -> Self {
        Self {
            entries: [TlbEntry::default(); TLB_ENTRIES],
        }
    }
}

/// The subset of `EntryHi`/`EntryLo0`/`EntryLo1` needed to read or write a
/// TLB entry, decoded from CP0 register bits.
#[derive(Clone, Copy, Debug)]
pub struct EntryFields {
    pub vpn2: u32,
    pub asid: u8,
    pub global: bool,
    pub pfn0: u32,
    pub valid0: bool,
    pub dirty0: bool,
    pub pfn1: u32,
    pub valid1: bool,
    pub dirty1: bool,
}

impl Tlb {
    /// Creates an all-invalid TLB.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes entry `index` (used by `tlbwi`/`tlbwr`).
    pub fn write_entry(&mut self, index: usize, fields: EntryFields) {
        let slot = &mut self.entries[index % TLB_ENTRIES];
        slot.vpn2 = fields.vpn2;
        slot.asid = fields.asid;
        slot.global = fields.global;
        slot.lo0 = HalfPage { pfn: fields.pfn0, valid: fields.valid0, dirty: fields.dirty0 };
        slot.lo1 = HalfPage { pfn: fields.pfn1, valid: fields.valid1, dirty: fields.dirty1 };
    }

    /// Reads entry `index` (used by `tlbr`).
    #[must_use]
    pub fn read_entry(&self, index: usize) -> EntryFields {
        let e = &self.entries[index % TLB_ENTRIES];
        EntryFields {
            vpn2: e.vpn2,
            asid: e.asid,
            global: e.global,
            pfn0: e.lo0.pfn,
            valid0: e.lo0.valid,
            dirty0: e.lo0.dirty,
            pfn1: e.lo1.pfn,
            valid1: e.lo1.valid,
            dirty1: e.lo1.dirty,
        }
    }

    /// `tlbp`: returns the index of the entry matching `vpn2`/`asid`
    /// (global entries match any ASID), if any.
    #[must_use]
    pub fn probe(&self, vpn2: u32, asid: u8) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.vpn2 == vpn2 && (e.global || e.asid == asid))
    }

    /// Translates `vaddr` using entries matching `asid`.
    pub fn translate(&self, vaddr: u32, asid: u8, intent: AccessIntent) -> Result<u32, Trap> {
        let page = vaddr >> 12;
        let vpn2 = page >> 1;
        let odd = page & 1 == 1;

        let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.vpn2 == vpn2 && (e.global || e.asid == asid))
        else {
            return Err(Trap::TlbRefill(vaddr));
        };

        let half = if odd { entry.lo1 } else { entry.lo0 };
        if !half.valid {
            return Err(Trap::TlbInvalid(vaddr));
        }
        if intent == AccessIntent::Store && !half.dirty {
            return Err(Trap::TlbModified(vaddr));
        }
        Ok((half.pfn << 12) | (vaddr & 0xFFF))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapped_entry(vpn2: u32) -> EntryFields {
        EntryFields {
            vpn2,
            asid: 1,
            global: false,
            pfn0: 0x1000,
            valid0: true,
            dirty0: false,
            pfn1: 0x1001,
            valid1: true,
            dirty1: true,
        }
    }

    #[test]
    fn translates_even_and_odd_halves() {
        let mut tlb = Tlb::new();
        tlb.write_entry(0, mapped_entry(0x1234));
        let vaddr_even = 0x1234 << 13;
        let vaddr_odd = vaddr_even + 0x1000;
        assert_eq!(
            tlb.translate(vaddr_even, 1, AccessIntent::Load).unwrap(),
            0x1000 << 12
        );
        assert_eq!(
            tlb.translate(vaddr_odd, 1, AccessIntent::Load).unwrap(),
            0x1001 << 12
        );
    }

    #[test]
    fn unmapped_vpn2_is_a_refill() {
        let tlb = Tlb::new();
        let err = tlb.translate(0x9000, 1, AccessIntent::Load).unwrap_err();
        assert_eq!(err, Trap::TlbRefill(0x9000));
    }

    #[test]
    fn store_to_clean_page_is_modified_exception() {
        let mut tlb = Tlb::new();
        tlb.write_entry(0, mapped_entry(0x1234));
        let vaddr_even = 0x1234 << 13;
        let err = tlb.translate(vaddr_even, 1, AccessIntent::Store).unwrap_err();
        assert_eq!(err, Trap::TlbModified(vaddr_even));
    }
}
