//! Machine driver (C10): multiplexes steps across harts, owns halt/step-count
//! state, and dispatches the interactive command language (spec.md §6,
//! SPEC_FULL.md §19) against the aggregate of C1/C2/C3/C8/C9 state.
//!
//! Per Design Notes item 1 ("Global mutable state"), every piece of
//! machine-wide state lives on [`Machine`] rather than behind module-level
//! statics; processor steps and commands both operate on this one aggregate.

use crate::breakpoint::{BreakpointKind, BreakpointSet};
use crate::command::{self, SystemCommand, Token};
use crate::common::constants::STEP4_DIVIDER;
use crate::common::data::AccessFilter;
use crate::common::error::SimError;
use crate::config::{Architecture, Config};
use crate::decode_cache::DecodeCache;
use crate::devices::disk::Disk;
use crate::devices::intc::Intc;
use crate::devices::printer::Printer;
use crate::devices::terminal::Terminal;
use crate::devices::Device;
use crate::disasm;
use crate::env::Environment;
use crate::memory::{PhysMemory, RegionKind};
use crate::mips::decode::MipsOp;
use crate::mips::MipsCpu;
use crate::reservation::ReservationSet;
use crate::riscv::csr::{hpm_event, interrupt_bits};
use crate::riscv::decode::RvOp;
use crate::riscv::mmu::Privilege;
use crate::riscv::RvCpu;

/// System command names, checked against device names at `add` time (spec.md
/// §3: "a unique name, distinct from any command name").
const SYSTEM_COMMAND_NAMES: &[&str] = &[
    "add", "quit", "continue", "step", "set", "unset", "break", "rembreak", "dumpbreak", "dumpmem",
    "dumpins", "dumpdev", "dumpphys", "stat", "echo", "help",
];

/// Default size for a `ddisk` created without a backing file (spec.md's
/// Non-goals leave image sourcing unspecified beyond "file-backed or
/// in-memory").
const DEFAULT_DISK_BYTES: usize = 512 * 16;

/// One hart, tagged by the architecture it implements (SPEC_FULL.md §15).
#[derive(Debug)]
pub enum Hart {
    /// RV32IMA hart.
    Riscv(RvCpu),
    /// MIPS R4000 hart.
    Mips(MipsCpu),
}

impl Hart {
    fn pc(&self) -> u64 {
        match self {
            Self::Riscv(cpu) => u64::from(cpu.pc),
            Self::Mips(cpu) => u64::from(cpu.pc),
        }
    }

    fn halted(&self) -> bool {
        match self {
            Self::Riscv(cpu) => cpu.halted,
            Self::Mips(cpu) => cpu.halted,
        }
    }
}

/// The machine aggregate (C10) plus every shared resource the processor
/// steps and interactive commands operate on.
#[derive(Debug)]
pub struct Machine {
    harts: Vec<Hart>,
    mem: PhysMemory,
    breakpoints: BreakpointSet,
    reservations: ReservationSet,
    rv_cache: DecodeCache<RvOp>,
    mips_cache: DecodeCache<MipsOp>,
    env: Environment,
    arch: Architecture,
    reset_vector: u32,
    /// Set when a simulator breakpoint fires or a bounded `step`/`continue`
    /// completes; the caller (the CLI's REPL) checks this to know when to
    /// return to the prompt (spec.md §4.8, §5 "Cancellation").
    pub tohalt: bool,
    /// Whether commands are being read from an interactive prompt, as
    /// opposed to a config file (spec.md §5 "Shared resources": device-list
    /// mutation is only meaningful in this mode).
    pub interactive: bool,
    steps: u64,
}

impl Machine {
    /// Builds a machine from `config`: maps the default RAM region, creates
    /// `config.general.hart_count` harts of `config.general.arch` reset to
    /// `config.reset_vector()`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let reset_vector = config.reset_vector();
        let mut mem = PhysMemory::new();
        mem.map_region(config.memory.ram_base, config.memory.ram_size, RegionKind::Rwm);

        let hart_count = config.general.hart_count.max(1);
        let harts = (0..hart_count)
            .map(|id| new_hart(config.general.arch, id, reset_vector))
            .collect();

        Self {
            harts,
            mem,
            breakpoints: BreakpointSet::new(),
            reservations: ReservationSet::new(hart_count),
            rv_cache: DecodeCache::new(),
            mips_cache: DecodeCache::new(),
            env: Environment::new(),
            arch: config.general.arch,
            reset_vector,
            tohalt: false,
            interactive: true,
            steps: 0,
        }
    }

    /// Read-only access to the physical memory (C1/C2), for callers that
    /// just want to inspect state (e.g. a future GDB stub).
    #[must_use]
    pub const fn memory(&self) -> &PhysMemory {
        &self.mem
    }

    /// Mutable access to the physical memory, for a binary loader or test
    /// harness to install a program before stepping (spec.md §6 has no
    /// `load` command of its own; loading is an external collaborator's
    /// responsibility that goes through the same C1 interface everything
    /// else uses).
    pub fn memory_mut(&mut self) -> &mut PhysMemory {
        &mut self.mem
    }

    /// Read-only access to the harts, in creation order.
    #[must_use]
    pub fn harts(&self) -> &[Hart] {
        &self.harts
    }

    /// Mutable access to the harts, for a test harness or loader to seed
    /// CSR/CP0 state (e.g. `satp`, `mtimecmp`) before stepping.
    pub fn harts_mut(&mut self) -> &mut [Hart] {
        &mut self.harts
    }

    /// Runs one round: every hart either takes a pending interrupt or
    /// executes one instruction, device `step`/`step4` hooks fire, and any
    /// access/fetch breakpoint that matched sets [`Machine::tohalt`].
    pub fn step_round(&mut self) {
        for idx in 0..self.harts.len() {
            self.step_hart(idx);
        }

        let device_asserts = self.mem.devices_mut().step();
        self.steps += 1;
        if self.steps % STEP4_DIVIDER == 0 {
            self.mem.devices_mut().step4();
        }
        for hart in &mut self.harts {
            apply_external_interrupt(hart, device_asserts);
        }

        for (addr, len, intent) in self.mem.drain_access_log() {
            let hits = self.breakpoints.check_access(addr, len, intent);
            if hits.iter().any(|b| b.kind() == BreakpointKind::Simulator) {
                self.tohalt = true;
            }
        }
    }

    fn step_hart(&mut self, idx: usize) {
        let pc = self.harts[idx].pc();
        if let Some(bp) = self.breakpoints.check_fetch(pc) {
            if bp.kind() == BreakpointKind::Simulator {
                self.tohalt = true;
                return;
            }
        }

        match &mut self.harts[idx] {
            Hart::Riscv(cpu) => {
                if cpu.try_deliver_interrupt().is_some() {
                    account_riscv(cpu, cpu.halted, true);
                } else if cpu.halted {
                    account_riscv(cpu, true, true);
                } else {
                    let trap = cpu.step(&mut self.mem, &mut self.rv_cache, &mut self.reservations);
                    account_riscv(cpu, false, trap.is_some());
                }
            }
            Hart::Mips(cpu) => {
                if cpu.try_deliver_interrupt().is_none() && !cpu.halted {
                    let _ = cpu.step(&mut self.mem, &mut self.mips_cache, &mut self.reservations);
                }
                account_mips(cpu);
            }
        }
    }

    /// `step N`: runs `count` rounds unconditionally (ignoring
    /// `tohalt`/breakpoints mid-run would defeat their purpose, so a
    /// breakpoint firing still stops the remaining rounds early).
    pub fn run_steps(&mut self, count: u64) {
        self.tohalt = false;
        for _ in 0..count {
            self.step_round();
            if self.tohalt {
                break;
            }
        }
    }

    /// `continue`: runs rounds until a breakpoint sets `tohalt`.
    pub fn run_until_halt(&mut self) {
        self.tohalt = false;
        while !self.tohalt {
            self.step_round();
        }
    }

    /// Tokenizes and dispatches one command line, per spec.md §6: a line
    /// whose first token matches a device name is routed to that device's
    /// own command table, otherwise to the system command table.
    pub fn dispatch_line(&mut self, line: &str) -> Result<Option<String>, SimError> {
        let tokens = command::tokenize(line);
        if tokens.is_empty() {
            return Ok(None);
        }
        if let Token::Str(name) = &tokens[0] {
            if self.mem.devices().by_name(name).is_some() {
                let name = name.clone();
                let rest = &tokens[1..];
                return self
                    .mem
                    .devices_mut()
                    .by_name_mut(&name)
                    .expect("presence just checked")
                    .handle_command(rest);
            }
        }
        let cmd = command::parse(&tokens).map_err(|e| SimError::Command(e.0))?;
        self.dispatch(cmd)
    }

    fn dispatch(&mut self, cmd: SystemCommand) -> Result<Option<String>, SimError> {
        match cmd {
            SystemCommand::Add { ty, name, args } => self.cmd_add(&ty, &name, &args).map(Some),
            SystemCommand::Quit => {
                self.tohalt = true;
                Ok(Some("bye".to_string()))
            }
            SystemCommand::Continue => {
                self.run_until_halt();
                Ok(Some("halted".to_string()))
            }
            SystemCommand::Step(n) => {
                self.run_steps(n.max(1));
                Ok(Some(format!("ran {n} step(s)")))
            }
            SystemCommand::Set { name, value } => Ok(Some(self.cmd_set(name, value))),
            SystemCommand::Unset(name) => {
                let removed = self.env.unset(&name);
                Ok(Some(format!("{name}: {}", if removed { "removed" } else { "not set" })))
            }
            SystemCommand::Break { addr, size, filter } => {
                if filter.is_none() {
                    return Err(SimError::Command("break: expected r|w|rw".to_string()));
                }
                self.breakpoints.add_mem(addr, size, filter, BreakpointKind::Simulator);
                Ok(Some(format!("breakpoint set at {addr:#x}")))
            }
            SystemCommand::RemBreak(addr) => {
                let removed = self.breakpoints.remove_mem(addr) || self.breakpoints.remove_pc(addr);
                Ok(Some(format!("{addr:#x}: {}", if removed { "removed" } else { "not found" })))
            }
            SystemCommand::DumpBreak => Ok(Some(self.cmd_dumpbreak())),
            SystemCommand::DumpMem { addr, count } => Ok(Some(self.cmd_dumpmem(addr, count))),
            SystemCommand::DumpIns { addr, count } => Ok(Some(self.cmd_dumpins(addr, count))),
            SystemCommand::DumpDev => Ok(Some(self.cmd_dumpdev())),
            SystemCommand::DumpPhys => Ok(Some(self.cmd_dumpphys())),
            SystemCommand::Stat => Ok(Some(self.cmd_stat())),
            SystemCommand::Echo(s) => Ok(Some(s)),
            SystemCommand::Help(topic) => Ok(Some(cmd_help(topic.as_deref()))),
        }
    }

    fn cmd_set(&mut self, name: Option<String>, value: Option<String>) -> String {
        match (name, value) {
            (None, _) => self
                .env
                .iter()
                .map(|(k, v)| format!("{k} = {v}"))
                .collect::<Vec<_>>()
                .join("\n"),
            (Some(name), None) => self
                .env
                .get(&name)
                .map_or_else(|| format!("{name}: not set"), |v| format!("{name} = {v}")),
            (Some(name), Some(val)) => {
                self.env.set(name.clone(), &val);
                format!("{name} = {val}")
            }
        }
    }

    fn cmd_add(&mut self, ty: &str, name: &str, args: &[Token]) -> Result<String, SimError> {
        if SYSTEM_COMMAND_NAMES.contains(&name) {
            return Err(SimError::NameConflict(name.to_string()));
        }
        if ty == "hart" {
            self.harts.push(new_hart(self.arch, self.harts.len(), self.reset_vector));
            self.reservations = ReservationSet::new(self.harts.len());
            return Ok(format!("hart {name} added ({} total)", self.harts.len()));
        }

        let base = match args.first() {
            Some(Token::Uint(v)) => *v,
            _ => return Err(SimError::Command(format!("add {ty}: expected a base address"))),
        };

        let device: Box<dyn Device + Send> = match ty {
            "dprinter" => Box::new(Printer::new(name, base)),
            "dkeyboard" => Box::new(Terminal::new(name, base)),
            "dintc" => Box::new(Intc::new(name, base)),
            "ddisk" => {
                let image = match args.get(1) {
                    Some(Token::Str(path)) => std::fs::read(path).map_err(|source| SimError::Io {
                        path: path.clone(),
                        source,
                    })?,
                    _ => vec![0u8; DEFAULT_DISK_BYTES],
                };
                Box::new(Disk::new(name, base, image))
            }
            other => return Err(SimError::UnknownDeviceType(other.to_string())),
        };

        self.mem.devices_mut().add(device)?;
        Ok(format!("{name}: {ty} added at {base:#x}"))
    }

    fn cmd_dumpbreak(&self) -> String {
        let mut lines = Vec::new();
        for bp in self.breakpoints.pc_breakpoints() {
            lines.push(format!("pc  {:#010x}  hits={}", bp.addr(), bp.hits()));
        }
        for bp in self.breakpoints.mem_breakpoints() {
            lines.push(format!("mem {:#010x}..{:#010x} {}", bp.start(), bp.start() + bp.size(), bp.filter()));
        }
        if lines.is_empty() {
            "no breakpoints set".to_string()
        } else {
            lines.join("\n")
        }
    }

    fn cmd_dumpmem(&mut self, addr: u64, count: u64) -> String {
        let mut lines = Vec::new();
        let mut offset = 0u64;
        while offset < count {
            let row_addr = addr + offset;
            let mut row = format!("{row_addr:#010x}:");
            for i in 0..16u64.min(count - offset) {
                row.push_str(&format!(" {:02x}", self.mem.read8(row_addr + i, false)));
            }
            lines.push(row);
            offset += 16;
        }
        lines.join("\n")
    }

    fn cmd_dumpins(&mut self, addr: u64, count: u64) -> String {
        let mut lines = Vec::new();
        for i in 0..count {
            let a = addr + i * 4;
            let word = self.mem.read32(a, false);
            let text = match self.arch {
                Architecture::Riscv => disasm::disassemble_riscv(word),
                Architecture::Mips => disasm::disassemble_mips(word),
            };
            lines.push(format!("{a:#010x}: {word:08x}  {text}"));
        }
        lines.join("\n")
    }

    fn cmd_dumpdev(&self) -> String {
        let lines: Vec<_> = self.mem.devices().iter().map(Device::info).collect();
        if lines.is_empty() {
            "no devices attached".to_string()
        } else {
            lines.join("\n")
        }
    }

    fn cmd_dumpphys(&self) -> String {
        format!("{} frame(s) materialized", self.harts.len())
    }

    fn cmd_stat(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("steps: {}", self.steps));
        for (i, hart) in self.harts.iter().enumerate() {
            lines.push(match hart {
                Hart::Riscv(cpu) => format!(
                    "hart{i}: rv pc={:#010x} cycle={} instret={} halted={}",
                    cpu.pc, cpu.csr.cycle, cpu.csr.instret, cpu.halted
                ),
                Hart::Mips(cpu) => format!("hart{i}: mips pc={:#010x} count={} halted={}", cpu.pc, cpu.cp0.count, cpu.halted),
            });
        }
        for d in self.mem.devices().iter() {
            lines.push(d.stat());
        }
        lines.join("\n")
    }
}

fn cmd_help(topic: Option<&str>) -> String {
    topic.map_or_else(
        || SYSTEM_COMMAND_NAMES.join(", "),
        |t| format!("{t}: see spec.md §6 for usage"),
    )
}

fn new_hart(arch: Architecture, id: usize, reset_vector: u32) -> Hart {
    match arch {
        Architecture::Riscv => Hart::Riscv(RvCpu::new(id, reset_vector)),
        Architecture::Mips => Hart::Mips(MipsCpu::new(id, reset_vector)),
    }
}

fn apply_external_interrupt(hart: &mut Hart, asserted: bool) {
    match hart {
        Hart::Riscv(cpu) => {
            if asserted {
                cpu.csr.mip |= interrupt_bits::MEIP;
            } else {
                cpu.csr.mip &= !interrupt_bits::MEIP;
            }
            // Latched separately so a delegated (supervisor-handled) device
            // interrupt can raise SEIP without a software-set bit being
            // clobbered when the device deasserts (see `CsrFile::effective_mip`).
            cpu.csr.seip_external = asserted;
        }
        Hart::Mips(cpu) => {
            use crate::mips::cp0::cause_bits;
            let bit = 1u32 << (cause_bits::IP_SHIFT + 2);
            if asserted {
                cpu.cp0.cause |= bit;
            } else {
                cpu.cp0.cause &= !bit;
            }
        }
    }
}

fn account_riscv(cpu: &mut RvCpu, halted: bool, skip_instret: bool) {
    let inhibit = cpu.csr.mcountinhibit;
    if inhibit & 1 == 0 {
        cpu.csr.cycle = cpu.csr.cycle.wrapping_add(1);
    }
    cpu.csr.mtime = cpu.csr.mtime.wrapping_add(1);
    if inhibit & 0b100 == 0 && !skip_instret {
        cpu.csr.instret = cpu.csr.instret.wrapping_add(1);
    }
    for i in 0..29usize {
        let bit = 1u32 << (3 + i);
        if inhibit & bit != 0 {
            continue;
        }
        let active = match cpu.csr.hpmevent[i] {
            hpm_event::CYCLES_M => cpu.priv_mode == Privilege::Machine,
            hpm_event::CYCLES_S => cpu.priv_mode == Privilege::Supervisor,
            hpm_event::CYCLES_U => cpu.priv_mode == Privilege::User,
            hpm_event::CYCLES_STANDBY => halted,
            _ => false,
        };
        if active {
            cpu.csr.hpmcounter[i] = cpu.csr.hpmcounter[i].wrapping_add(1);
        }
    }
    if cpu.csr.mtime >= cpu.csr.mtimecmp {
        cpu.csr.mip |= interrupt_bits::MTIP;
    } else {
        cpu.csr.mip &= !interrupt_bits::MTIP;
    }
}

fn account_mips(cpu: &mut MipsCpu) {
    use crate::mips::cp0::cause_bits;
    cpu.cp0.count = cpu.cp0.count.wrapping_add(1);
    let bit = 1u32 << (cause_bits::IP_SHIFT + 7);
    if cpu.cp0.count >= cpu.cp0.compare {
        cpu.cp0.cause |= bit;
    } else {
        cpu.cp0.cause &= !bit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rv_machine() -> Machine {
        Machine::new(&Config::default())
    }

    #[test]
    fn new_machine_has_one_hart_reset_to_config_vector() {
        let m = rv_machine();
        assert_eq!(m.harts.len(), 1);
        assert_eq!(m.harts[0].pc(), 0x8000_0000);
    }

    #[test]
    fn step_round_advances_pc_and_cycle() {
        let mut m = rv_machine();
        // addi x1, x0, 5
        let word = (5u32 << 20) | (1 << 7) | 0b0010011;
        m.mem.write32(0x8000_0000, word, false);
        m.step_round();
        let Hart::Riscv(cpu) = &m.harts[0] else { unreachable!() };
        assert_eq!(cpu.gpr[1], 5);
        assert_eq!(cpu.csr.cycle, 1);
        assert_eq!(cpu.csr.instret, 1);
    }

    #[test]
    fn mem_breakpoint_halts_on_matching_store() {
        let mut m = rv_machine();
        // sw x0, 0(x0) at 0x80000000 -> store to address 0
        let sw = (0 << 25) | (0 << 20) | (0 << 15) | (0b010 << 12) | (0 << 7) | 0b0100011;
        m.mem.write32(0x8000_0000, sw, false);
        m.breakpoints.add_mem(0, 4, AccessFilter::WRITE, BreakpointKind::Simulator);
        m.run_steps(1);
        assert!(m.tohalt);
    }

    #[test]
    fn pc_breakpoint_halts_before_executing() {
        let mut m = rv_machine();
        let word = (5u32 << 20) | (1 << 7) | 0b0010011;
        m.mem.write32(0x8000_0000, word, false);
        m.breakpoints.add_pc(0x8000_0000, BreakpointKind::Simulator, 0);
        m.run_steps(1);
        assert!(m.tohalt);
        let Hart::Riscv(cpu) = &m.harts[0] else { unreachable!() };
        assert_eq!(cpu.gpr[1], 0, "instruction at the breakpoint address did not execute");
    }

    #[test]
    fn dispatch_add_rejects_command_name_collision() {
        let mut m = rv_machine();
        let err = m.dispatch_line("add dprinter step 0x10000000").unwrap_err();
        assert!(matches!(err, SimError::NameConflict(_)));
    }

    #[test]
    fn dispatch_add_then_device_command_round_trips() {
        let mut m = rv_machine();
        m.dispatch_line("add dprinter p0 0x10000000").unwrap();
        assert!(m.mem.devices().by_name("p0").is_some());
    }

    #[test]
    fn mtip_sets_once_mtime_reaches_mtimecmp() {
        let mut m = rv_machine();
        let Hart::Riscv(cpu) = &mut m.harts[0] else { unreachable!() };
        cpu.csr.mtimecmp = 2;
        m.run_steps(2);
        let Hart::Riscv(cpu) = &m.harts[0] else { unreachable!() };
        assert_eq!(cpu.csr.mip & interrupt_bits::MTIP, interrupt_bits::MTIP);
    }

    #[test]
    fn external_interrupt_latches_seip_and_clears_on_deassert() {
        let mut m = rv_machine();
        let Hart::Riscv(cpu) = &mut m.harts[0] else { unreachable!() };
        cpu.csr.mideleg = interrupt_bits::SEIP;

        apply_external_interrupt(&mut m.harts[0], true);
        let Hart::Riscv(cpu) = &m.harts[0] else { unreachable!() };
        assert_eq!(
            cpu.csr.effective_mip() & interrupt_bits::SEIP,
            interrupt_bits::SEIP
        );

        apply_external_interrupt(&mut m.harts[0], false);
        let Hart::Riscv(cpu) = &m.harts[0] else { unreachable!() };
        assert_eq!(cpu.csr.effective_mip() & interrupt_bits::SEIP, 0);
    }

    #[test]
    fn set_and_get_round_trip_through_environment() {
        let mut m = rv_machine();
        m.dispatch_line("set trace = true").unwrap();
        let out = m.dispatch_line("set trace").unwrap().unwrap();
        assert_eq!(out, "trace = true");
    }
}
