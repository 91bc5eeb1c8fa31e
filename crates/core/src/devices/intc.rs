//! `dintc`: a minimal interrupt controller aggregating per-device lines.
//!
//! Grounded in the teacher's `soc::devices::plic` pattern (a priority-free
//! pending/enable register pair) but reduced to the one aggregate line the
//! trap engine consumes, since full PLIC priority arbitration is beyond
//! this spec's per-peripheral scope.

use super::Device;

const REG_PENDING: u64 = 0x00;
const REG_ENABLE: u64 = 0x04;
const REG_CLAIM: u64 = 0x08;

/// Aggregates up to 32 device interrupt lines into pending/enable bitmaps
/// and a single claim register.
pub struct Intc {
    name: String,
    base: u64,
    pending: u32,
    enable: u32,
}

impl Intc {
    /// Creates an interrupt controller claiming 12 bytes at `base`.
    #[must_use]
    pub fn new(name: impl Into<String>, base: u64) -> Self {
        Self {
            name: name.into(),
            base,
            pending: 0,
            enable: 0,
        }
    }

    /// Sets or clears line `line` (0-31) as asserted, called by the machine
    /// driver after ticking each device.
    pub fn set_line(&mut self, line: u32, asserted: bool) {
        if line >= 32 {
            return;
        }
        if asserted {
            self.pending |= 1 << line;
        } else {
            self.pending &= !(1 << line);
        }
    }

    /// Returns `true` if any enabled line is currently pending — the signal
    /// the trap engine treats as an external interrupt request.
    #[must_use]
    pub const fn any_pending(&self) -> bool {
        (self.pending & self.enable) != 0
    }
}

impl Device for Intc {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        "dintc"
    }

    fn address_range(&self) -> (u64, u64) {
        (self.base, self.base + 12)
    }

    fn read(&mut self, offset: u64, _width: u8) -> u64 {
        match offset {
            REG_PENDING => u64::from(self.pending & self.enable),
            REG_ENABLE => u64::from(self.enable),
            _ => 0,
        }
    }

    fn write(&mut self, offset: u64, _width: u8, value: u64) {
        match offset {
            REG_ENABLE => self.enable = value as u32,
            REG_CLAIM => self.pending &= !(value as u32),
            _ => {}
        }
    }

    fn stat(&self) -> String {
        format!(
            "{}: pending={:#010x} enable={:#010x}",
            self.name, self.pending, self.enable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_pending_line_reported_and_claimable() {
        let mut intc = Intc::new("intc0", 0x1000_3000);
        intc.set_line(3, true);
        assert!(!intc.any_pending());
        intc.write(REG_ENABLE, 4, 1 << 3);
        assert!(intc.any_pending());
        assert_eq!(intc.read(REG_PENDING, 4), 1 << 3);
        intc.write(REG_CLAIM, 4, 1 << 3);
        assert!(!intc.any_pending());
    }
}
