//! MIPS R4000 CP0 (system control coprocessor) register bank.

/// CP0 register numbers used by this core (a subset of the R4000's full
/// bank — enough to support TLB refill, exceptions, and the `Count`/
/// `Compare` timer).
pub mod reg {
    pub const INDEX: u32 = 0;
    pub const RANDOM: u32 = 1;
    pub const ENTRYLO0: u32 = 2;
    pub const ENTRYLO1: u32 = 3;
    pub const CONTEXT: u32 = 4;
    pub const PAGEMASK: u32 = 5;
    pub const WIRED: u32 = 6;
    pub const BADVADDR: u32 = 8;
    pub const COUNT: u32 = 9;
    pub const ENTRYHI: u32 = 10;
    pub const COMPARE: u32 = 11;
    pub const STATUS: u32 = 12;
    pub const CAUSE: u32 = 13;
    pub const EPC: u32 = 14;
    pub const PRID: u32 = 15;
    pub const CONFIG: u32 = 16;
}

/// Bit positions within the `Status` register.
pub mod status_bits {
    pub const IE: u32 = 1 << 0;
    pub const EXL: u32 = 1 << 1;
    pub const ERL: u32 = 1 << 2;
    pub const KSU_SHIFT: u32 = 3;
    pub const KSU_MASK: u32 = 0b11 << KSU_SHIFT;
    pub const IM_SHIFT: u32 = 8;
    pub const IM_MASK: u32 = 0xFF << IM_SHIFT;
}

/// Bit positions within the `Cause` register.
pub mod cause_bits {
    pub const EXC_CODE_SHIFT: u32 = 2;
    pub const EXC_CODE_MASK: u32 = 0x1F << EXC_CODE_SHIFT;
    pub const IP_SHIFT: u32 = 8;
    pub const IP_MASK: u32 = 0xFF << IP_SHIFT;
    pub const BD: u32 = 1 << 31;
}

/// The MIPS R4000 CP0 register file.
#[derive(Debug, Default)]
pub struct Cp0 {
    pub index: u32,
    pub random: u32,
    pub entry_lo0: u32,
    pub entry_lo1: u32,
    pub context: u32,
    pub page_mask: u32,
    pub wired: u32,
    pub bad_vaddr: u32,
    pub count: u32,
    pub entry_hi: u32,
    pub compare: u32,
    pub status: u32,
    pub cause: u32,
    pub epc: u32,
}

impl Cp0 {
    /// Power-on reset state: interrupts masked, kernel mode, error level
    /// set (matches the R4000 reset behavior of starting with `ERL` set so
    /// the reset-vector fetch is treated as uncached/unmapped).
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: status_bits::ERL,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn kernel_mode(&self) -> bool {
        self.status & (status_bits::EXL | status_bits::ERL) != 0
            || (self.status & status_bits::KSU_MASK) >> status_bits::KSU_SHIFT == 0
    }

    #[must_use]
    pub fn read(&self, n: u32) -> u32 {
        match n {
            reg::INDEX => self.index,
            reg::RANDOM => self.random,
            reg::ENTRYLO0 => self.entry_lo0,
            reg::ENTRYLO1 => self.entry_lo1,
            reg::CONTEXT => self.context,
            reg::PAGEMASK => self.page_mask,
            reg::WIRED => self.wired,
            reg::BADVADDR => self.bad_vaddr,
            reg::COUNT => self.count,
            reg::ENTRYHI => self.entry_hi,
            reg::COMPARE => self.compare,
            reg::STATUS => self.status,
            reg::CAUSE => self.cause,
            reg::EPC => self.epc,
            reg::PRID => 0x0000_0400, // R4000
            _ => 0,
        }
    }

    pub fn write(&mut self, n: u32, value: u32) {
        match n {
            reg::INDEX => self.index = value,
            reg::RANDOM => self.random = value,
            reg::ENTRYLO0 => self.entry_lo0 = value,
            reg::ENTRYLO1 => self.entry_lo1 = value,
            reg::CONTEXT => self.context = value,
            reg::PAGEMASK => self.page_mask = value,
            reg::WIRED => self.wired = value,
            reg::BADVADDR => self.bad_vaddr = value,
            reg::COUNT => self.count = value,
            reg::ENTRYHI => self.entry_hi = value,
            reg::COMPARE => self.compare = value,
            reg::STATUS => self.status = value,
            reg::CAUSE => {
                // Only the software interrupt bits (IP0/IP1) are writable.
                let writable = 0b11 << cause_bits::IP_SHIFT;
                self.cause = (self.cause & !writable) | (value & writable);
            }
            reg::EPC => self.epc = value,
            _ => {}
        }
    }
}
