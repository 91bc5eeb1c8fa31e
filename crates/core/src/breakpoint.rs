//! Breakpoint engine (C8).
//!
//! Two independent kinds of breakpoint are tracked: PC breakpoints (halt
//! when the fetch address matches, optionally after ignoring the first few
//! hits) and memory-access breakpoints (halt when a load/store/fetch falls
//! inside an address range with a matching {R, W, RW} filter). Each carries
//! a [`BreakpointKind`] distinguishing breakpoints the user set with the
//! `break` command from ones a remote debugger installed — the GDB remote
//! stub itself is out of scope (spec.md Non-goals), but the distinction is
//! kept so a future stub only needs to plug into [`BreakpointKind::Debugger`]
//! without reworking this module.

use crate::common::data::{AccessFilter, AccessIntent};

/// Who installed a breakpoint, and therefore who should be notified when it
/// fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakpointKind {
    /// Set by the interactive `break`/`dumpins` commands; firing halts the
    /// step loop and returns to the command prompt.
    Simulator,
    /// Installed by a remote debugger; firing should notify that debugger
    /// (via the GDB stub hook) rather than just halting locally.
    Debugger,
}

/// A breakpoint on the fetch (PC) address.
#[derive(Clone, Copy, Debug)]
pub struct PcBreakpoint {
    addr: u64,
    kind: BreakpointKind,
    /// Number of remaining hits to silently ignore before this breakpoint
    /// actually halts execution.
    ignore_count: u64,
    /// Total number of times this breakpoint's address has been fetched.
    hits: u64,
}

impl PcBreakpoint {
    #[must_use]
    pub const fn addr(&self) -> u64 {
        self.addr
    }

    #[must_use]
    pub const fn kind(&self) -> BreakpointKind {
        self.kind
    }

    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }
}

/// A breakpoint on a memory address range for a given access direction.
#[derive(Clone, Copy, Debug)]
pub struct MemBreakpoint {
    start: u64,
    size: u64,
    filter: AccessFilter,
    kind: BreakpointKind,
}

impl MemBreakpoint {
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub const fn filter(&self) -> AccessFilter {
        self.filter
    }

    #[must_use]
    pub const fn kind(&self) -> BreakpointKind {
        self.kind
    }

    fn overlaps(&self, addr: u64, len: u64) -> bool {
        addr < self.start + self.size && self.start < addr + len
    }
}

/// The full set of breakpoints installed on a machine, kept sorted by
/// address for predictable `dumpbreak` ordering.
#[derive(Debug, Default)]
pub struct BreakpointSet {
    pc: Vec<PcBreakpoint>,
    mem: Vec<MemBreakpoint>,
}

impl BreakpointSet {
    /// Creates an empty breakpoint set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a PC breakpoint at `addr`, ignoring the first
    /// `ignore_count` hits before it fires.
    pub fn add_pc(&mut self, addr: u64, kind: BreakpointKind, ignore_count: u64) {
        let idx = self.pc.partition_point(|b| b.addr < addr);
        self.pc.insert(
            idx,
            PcBreakpoint {
                addr,
                kind,
                ignore_count,
                hits: 0,
            },
        );
    }

    /// Removes the PC breakpoint at `addr`, if any. Returns `true` if one
    /// was removed.
    pub fn remove_pc(&mut self, addr: u64) -> bool {
        let before = self.pc.len();
        self.pc.retain(|b| b.addr != addr);
        self.pc.len() != before
    }

    /// Installs a memory-access breakpoint over `[start, start+size)`.
    pub fn add_mem(&mut self, start: u64, size: u64, filter: AccessFilter, kind: BreakpointKind) {
        let idx = self.mem.partition_point(|b| b.start < start);
        self.mem.insert(
            idx,
            MemBreakpoint {
                start,
                size,
                filter,
                kind,
            },
        );
    }

    /// Removes the memory breakpoint starting exactly at `start`. Returns
    /// `true` if one was removed.
    pub fn remove_mem(&mut self, start: u64) -> bool {
        let before = self.mem.len();
        self.mem.retain(|b| b.start != start);
        self.mem.len() != before
    }

    /// Records a fetch at `addr`; returns the breakpoint that fires, if any
    /// (after accounting for its ignore-count).
    pub fn check_fetch(&mut self, addr: u64) -> Option<PcBreakpoint> {
        let bp = self.pc.iter_mut().find(|b| b.addr == addr)?;
        bp.hits += 1;
        if bp.ignore_count > 0 {
            bp.ignore_count -= 1;
            return None;
        }
        Some(*bp)
    }

    /// Returns every memory breakpoint whose range and filter match an
    /// access of `len` bytes at `addr` with the given intent.
    #[must_use]
    pub fn check_access(&self, addr: u64, len: u64, intent: AccessIntent) -> Vec<MemBreakpoint> {
        self.mem
            .iter()
            .filter(|b| b.overlaps(addr, len) && b.filter.matches(intent))
            .copied()
            .collect()
    }

    /// All PC breakpoints, in address order (for `dumpbreak`).
    #[must_use]
    pub fn pc_breakpoints(&self) -> &[PcBreakpoint] {
        &self.pc
    }

    /// All memory breakpoints, in address order (for `dumpbreak`).
    #[must_use]
    pub fn mem_breakpoints(&self) -> &[MemBreakpoint] {
        &self.mem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pc_breakpoint_fires_on_matching_fetch() {
        let mut set = BreakpointSet::new();
        set.add_pc(0x1000, BreakpointKind::Simulator, 0);
        assert!(set.check_fetch(0x1000).is_some());
        assert!(set.check_fetch(0x1004).is_none());
    }

    #[test]
    fn pc_breakpoint_ignores_configured_hit_count() {
        let mut set = BreakpointSet::new();
        set.add_pc(0x2000, BreakpointKind::Simulator, 2);
        assert!(set.check_fetch(0x2000).is_none());
        assert!(set.check_fetch(0x2000).is_none());
        let hit = set.check_fetch(0x2000).expect("third hit fires");
        assert_eq!(hit.hits(), 3);
    }

    #[test]
    fn mem_breakpoint_matches_filter_and_range() {
        let mut set = BreakpointSet::new();
        set.add_mem(0x4000, 0x10, AccessFilter::WRITE, BreakpointKind::Simulator);
        assert!(set
            .check_access(0x4004, 4, AccessIntent::Store)
            .len()
            == 1);
        assert!(set.check_access(0x4004, 4, AccessIntent::Load).is_empty());
        assert!(set.check_access(0x5000, 4, AccessIntent::Store).is_empty());
    }

    #[test]
    fn remove_pc_breakpoint() {
        let mut set = BreakpointSet::new();
        set.add_pc(0x1000, BreakpointKind::Simulator, 0);
        assert!(set.remove_pc(0x1000));
        assert!(set.check_fetch(0x1000).is_none());
    }
}
