//! Device registry (C2): memory-mapped peripherals dispatched by address.
//!
//! Mirrors the teacher's `soc::traits::Device` / `soc::interconnect::Bus`
//! split: a small trait carrying the capability vector a device may
//! implement, and a registry that owns the devices in insertion order and
//! dispatches reads/writes/ticks to whichever one claims an address.
//! Per-peripheral logic beyond read/write/step/step4 is out of scope (the
//! spec's Non-goals) — the four built-in devices here (`printer`,
//! `terminal`, `disk`, `intc`) implement just enough behavior to exercise
//! the registry and the step loop end-to-end.

pub mod disk;
pub mod intc;
pub mod printer;
pub mod terminal;

use crate::command::Token;
use crate::common::error::SimError;

/// Capability vector a memory-mapped device may implement (spec.md §4.2).
/// Every method has a default no-op/zero implementation, so a device only
/// overrides the handful it actually supports.
pub trait Device {
    /// Device instance name, as given to `add` — used for name-collision
    /// checks and `dumpdev`/`stat` output.
    fn name(&self) -> &str;

    /// Device type tag (`"dprinter"`, `"dorder"`, ...), used by `info`.
    fn type_name(&self) -> &'static str;

    /// `[base, base+size)` claimed by this device in the physical address
    /// space.
    fn address_range(&self) -> (u64, u64);

    /// Reads `width` bytes (1, 2, 4 or 8) at `offset` from the device's
    /// base address. Unclaimed widths default to zero.
    fn read(&mut self, offset: u64, width: u8) -> u64 {
        let _ = (offset, width);
        0
    }

    /// Writes `width` bytes (1, 2, 4 or 8) at `offset` from the device's
    /// base address.
    fn write(&mut self, offset: u64, width: u8, value: u64) {
        let _ = (offset, width, value);
    }

    /// Called once per simulator step. Returns `true` if the device wants
    /// to assert its interrupt line this step.
    fn step(&mut self) -> bool {
        false
    }

    /// Called every [`crate::common::constants::STEP4_DIVIDER`]-th step,
    /// for devices that only need coarse-grained ticking (e.g. flushing
    /// buffered terminal output).
    fn step4(&mut self) {}

    /// One-line summary for `dumpdev`.
    fn info(&self) -> String {
        format!("{} ({})", self.name(), self.type_name())
    }

    /// One-line statistics summary for `stat`.
    fn stat(&self) -> String {
        String::new()
    }

    /// Handles a line dispatched to this device's own command table (spec.md
    /// §6: "a line whose first token matches a device name dispatches to
    /// that device's command table"), with the device-name token already
    /// stripped. Returns `Ok(None)` for a command this device type doesn't
    /// recognize, matching the "false return re-prompts" policy (spec.md
    /// §7) rather than treating an unrecognized subcommand as fatal.
    fn handle_command(&mut self, tokens: &[Token]) -> Result<Option<String>, SimError> {
        let _ = tokens;
        Ok(None)
    }
}

/// Owns every device attached to the machine and dispatches by address, in
/// insertion order (spec.md §4.2: "first device whose range contains the
/// address, in insertion order, handles the access").
#[derive(Default)]
pub struct DeviceRegistry {
    devices: Vec<Box<dyn Device + Send>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new device, rejecting a name collision with an existing
    /// device (command-name collisions are checked by the caller, which
    /// knows the command table).
    pub fn add(&mut self, device: Box<dyn Device + Send>) -> Result<(), SimError> {
        if self.devices.iter().any(|d| d.name() == device.name()) {
            return Err(SimError::NameConflict(device.name().to_string()));
        }
        self.devices.push(device);
        Ok(())
    }

    /// Removes the device named `name`, if any.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| d.name() != name);
        self.devices.len() != before
    }

    /// Looks up a device by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&(dyn Device + Send)> {
        self.devices.iter().find(|d| d.name() == name).map(AsRef::as_ref)
    }

    /// Looks up a device by name, mutably.
    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut (dyn Device + Send)> {
        self.devices.iter_mut().find(|d| d.name() == name)
    }

    /// Reads from whichever device claims `addr`. Returns `None` if no
    /// device claims it.
    pub fn read(&mut self, addr: u64, width: u8) -> Option<u64> {
        self.devices.iter_mut().find_map(|d| {
            let (base, end) = d.address_range();
            if addr >= base && addr < end {
                Some(d.read(addr - base, width))
            } else {
                None
            }
        })
    }

    /// Writes to whichever device claims `addr`. Returns `true` if a
    /// device claimed the address.
    pub fn write(&mut self, addr: u64, width: u8, value: u64) -> bool {
        for d in &mut self.devices {
            let (base, end) = d.address_range();
            if addr >= base && addr < end {
                d.write(addr - base, width, value);
                return true;
            }
        }
        false
    }

    /// Ticks every device once, collecting whether any asserted its
    /// interrupt line.
    pub fn step(&mut self) -> bool {
        let mut any = false;
        for d in &mut self.devices {
            any |= d.step();
        }
        any
    }

    /// Ticks every device's coarse `step4` hook.
    pub fn step4(&mut self) {
        for d in &mut self.devices {
            d.step4();
        }
    }

    /// Iterates devices in insertion (dispatch) order, for `dumpdev`.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn Device + Send)> {
        self.devices.iter().map(AsRef::as_ref)
    }
}
